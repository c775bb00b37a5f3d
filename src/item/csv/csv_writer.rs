use std::{
    cell::RefCell,
    fs::File,
    io::{self, Write},
    path::Path,
    result,
};

use csv::{Writer, WriterBuilder};

use crate::{core::item::RowWriter, error::ConvertError};

/// CSV implementation of the rectangular output boundary.
///
/// Wraps a `csv::Writer`, which handles quoting of fields containing
/// separators or newlines. The header and every row are written through
/// `write_record`, so the writer stays agnostic of any row shape beyond
/// cell count.
pub struct CsvRowWriter<T: Write> {
    wrapper: RefCell<Writer<T>>,
}

impl<T: Write> RowWriter for CsvRowWriter<T> {
    fn write_header(&self, columns: &[String]) -> Result<(), ConvertError> {
        let result = self.wrapper.borrow_mut().write_record(columns);
        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(ConvertError::RowWrite(error.to_string())),
        }
    }

    fn write_row(&self, cells: &[String]) -> Result<(), ConvertError> {
        let result = self.wrapper.borrow_mut().write_record(cells);
        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(ConvertError::RowWrite(error.to_string())),
        }
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// Note that this also flushes the underlying writer.
    fn flush(&self) -> Result<(), ConvertError> {
        let result = self.wrapper.borrow_mut().flush();
        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(ConvertError::RowWrite(error.to_string())),
        }
    }
}

impl<T: Write> CsvRowWriter<T> {
    /// Unwraps the underlying writer, flushing remaining buffered output.
    pub fn into_inner(self) -> result::Result<T, ConvertError> {
        let result = self.wrapper.into_inner().into_inner();
        match result {
            Ok(inner) => Ok(inner),
            Err(error) => Err(ConvertError::RowWrite(error.to_string())),
        }
    }
}

#[derive(Default)]
pub struct CsvRowWriterBuilder {
    delimiter: u8,
}

impl CsvRowWriterBuilder {
    pub fn new() -> CsvRowWriterBuilder {
        CsvRowWriterBuilder { delimiter: b',' }
    }

    pub fn delimiter(mut self, delimiter: u8) -> CsvRowWriterBuilder {
        self.delimiter = delimiter;
        self
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvRowWriter<File>, ConvertError> {
        let wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(false)
            .from_path(path);

        match wtr {
            Ok(wtr) => Ok(CsvRowWriter {
                wrapper: RefCell::new(wtr),
            }),
            Err(error) => Err(ConvertError::RowWrite(error.to_string())),
        }
    }

    /// Builds a writer over anything implementing `io::Write`.
    ///
    /// # Example
    ///
    /// ```
    /// # use std::error::Error;
    /// # use flattable::{item::csv::csv_writer::CsvRowWriterBuilder, core::item::RowWriter};
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let wtr = CsvRowWriterBuilder::new().from_writer(vec![]);
    ///
    ///     wtr.write_header(&["city".to_string(), "popcount".to_string()])?;
    ///     wtr.write_row(&["Boston".to_string(), "4628910".to_string()])?;
    ///     wtr.write_row(&["Concord, MA".to_string(), "42695".to_string()])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "\
    /// city,popcount
    /// Boston,4628910
    /// \"Concord, MA\",42695
    /// ");
    ///     Ok(())
    /// }
    /// ```
    pub fn from_writer<W: io::Write>(self, wtr: W) -> CsvRowWriter<W> {
        let wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(false)
            .from_writer(wtr);

        CsvRowWriter {
            wrapper: RefCell::new(wtr),
        }
    }
}
