use log::info;

use crate::{core::item::RowWriter, error::ConvertError};

/// Row writer that logs every row at info level, useful for debugging.
#[derive(Default)]
pub struct LoggerWriter {}

impl RowWriter for LoggerWriter {
    fn write_header(&self, columns: &[String]) -> Result<(), ConvertError> {
        info!("Header:{columns:?}");
        Ok(())
    }

    fn write_row(&self, cells: &[String]) -> Result<(), ConvertError> {
        info!("Row:{cells:?}");
        Ok(())
    }

    fn flush(&self) -> Result<(), ConvertError> {
        Ok(())
    }
}
