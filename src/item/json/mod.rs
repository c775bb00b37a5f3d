pub mod json_reader;
