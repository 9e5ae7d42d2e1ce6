extern crate csv;

use crate::sim::results::{LinkColumn, NodeColumn, ResultsStore};
use std::path::Path;

#[derive(Debug)]
pub enum CsvError {
    OpenFileError,
    WriteError(String),
}

impl From<CsvError> for String {
    fn from(error: CsvError) -> Self {
        match error {
            CsvError::OpenFileError => "Failed to open file".to_string(),
            CsvError::WriteError(msg) => format!("Write error: {}", msg),
        }
    }
}

/// Write a results store as CSV, one row per (name, time, attribute).
/// Node rows carry demand/head/pressure, link rows flowrate/velocity;
/// each row also repeats the component type for downstream filtering.
pub fn write_results(filename: &str, results: &ResultsStore) -> Result<(), CsvError> {
    let mut writer = match csv::Writer::from_path(Path::new(filename)) {
        Ok(w) => w,
        Err(_) => {
            return Err(CsvError::OpenFileError);
        }
    };

    if let Err(e) = writer.write_record(["name", "type", "time_sec", "attribute", "value"]) {
        return Err(CsvError::WriteError(e.to_string()));
    }

    for step in 0..results.num_timesteps() {
        let t = results.times()[step];
        for (node_id, name) in results.node_names().iter().enumerate() {
            for (attribute, column) in [
                ("demand", NodeColumn::Demand),
                ("head", NodeColumn::Head),
                ("pressure", NodeColumn::Pressure),
            ] {
                let value = results.node_value(step, node_id, column).to_string();
                let time = t.to_string();
                if let Err(e) = writer.write_record([
                    name.as_str(),
                    results.node_type_by_id(node_id),
                    time.as_str(),
                    attribute,
                    value.as_str(),
                ]) {
                    return Err(CsvError::WriteError(e.to_string()));
                }
            }
        }
        for (link_id, name) in results.link_names().iter().enumerate() {
            for (attribute, column) in [
                ("flowrate", LinkColumn::Flowrate),
                ("velocity", LinkColumn::Velocity),
            ] {
                let value = results.link_value(step, link_id, column).to_string();
                let time = t.to_string();
                if let Err(e) = writer.write_record([
                    name.as_str(),
                    results.link_type_by_id(link_id),
                    time.as_str(),
                    attribute,
                    value.as_str(),
                ]) {
                    return Err(CsvError::WriteError(e.to_string()));
                }
            }
        }
    }

    match writer.flush() {
        Ok(_) => Ok(()),
        Err(_) => Err(CsvError::WriteError(format!("Error writing file {}", filename))),
    }
}
