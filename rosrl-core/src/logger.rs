//! Tabular progress logging: key/value rows recorded during an epoch and dumped once per epoch.

use anyhow::Result;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub const PROGRESS_FILE: &str = "progress.csv";

/// Where the epoch loop sends its reduced statistics.
pub trait TabularSink {
    fn record_tabular(&mut self, key: &str, value: f64);

    /// Writes the recorded row and clears it.
    fn dump_tabular(&mut self) -> Result<()>;

    /// The run's log directory, if it has one. Snapshots land here.
    fn dir(&self) -> Option<&Path>;
}

/// One output format of a `TabularLogger`.
pub trait TabularOutput {
    fn write_row(&mut self, row: &BTreeMap<String, f64>) -> Result<()>;
}

/// Fans every dumped row out to its outputs. Rows are keyed, so columns come out sorted.
#[derive(Default)]
pub struct TabularLogger {
    dir: Option<PathBuf>,
    outputs: Vec<Box<dyn TabularOutput>>,
    row: BTreeMap<String, f64>,
}

impl TabularLogger {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            outputs: vec![],
            row: BTreeMap::new(),
        }
    }

    pub fn with_output(mut self, output: impl TabularOutput + 'static) -> Self {
        self.outputs.push(Box::new(output));
        self
    }
}

impl TabularSink for TabularLogger {
    fn record_tabular(&mut self, key: &str, value: f64) {
        self.row.insert(key.to_owned(), value);
    }

    fn dump_tabular(&mut self) -> Result<()> {
        let row = std::mem::take(&mut self.row);
        if row.is_empty() {
            return Ok(());
        }
        for output in self.outputs.iter_mut() {
            output.write_row(&row)?;
        }
        Ok(())
    }

    fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

fn format_value(value: f64) -> String {
    if value.is_finite() && value != 0. && (value.abs() >= 1e5 || value.abs() < 1e-3) {
        format!("{value:.3e}")
    } else {
        format!("{value:.4}")
    }
}

/// A boxed key/value table, one per dump.
pub struct HumanOutput<W: Write> {
    writer: W,
}

impl HumanOutput<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            writer: std::io::stdout(),
        }
    }
}

impl<W: Write> HumanOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TabularOutput for HumanOutput<W> {
    fn write_row(&mut self, row: &BTreeMap<String, f64>) -> Result<()> {
        let cells: Vec<(&str, String)> = row
            .iter()
            .map(|(key, value)| (key.as_str(), format_value(*value)))
            .collect();
        let key_width = cells.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let value_width = cells.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let dashes = "-".repeat(key_width + value_width + 7);
        writeln!(self.writer, "{dashes}")?;
        for (key, value) in cells {
            writeln!(
                self.writer,
                "| {key:<key_width$} | {value:>value_width$} |"
            )?;
        }
        writeln!(self.writer, "{dashes}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// `progress.csv`. A row with keys the header lacks rewrites the file with the widened header,
/// earlier rows get empty cells for the new columns.
pub struct CsvOutput {
    path: PathBuf,
    keys: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvOutput {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(PROGRESS_FILE);
        File::create(&path)?;
        Ok(Self {
            path,
            keys: vec![],
            rows: vec![],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rewrite(&self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writeln!(writer, "{}", self.keys.join(","))?;
        for row in &self.rows {
            writeln!(writer, "{}", row.join(","))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn append_last(&self) -> Result<()> {
        let mut file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
        if let Some(row) = self.rows.last() {
            writeln!(file, "{}", row.join(","))?;
        }
        Ok(())
    }
}

impl TabularOutput for CsvOutput {
    fn write_row(&mut self, row: &BTreeMap<String, f64>) -> Result<()> {
        let new_keys: Vec<String> = row
            .keys()
            .filter(|key| !self.keys.contains(key))
            .cloned()
            .collect();
        let widened = !new_keys.is_empty();
        if widened {
            self.keys.extend(new_keys);
            for earlier in self.rows.iter_mut() {
                earlier.resize(self.keys.len(), String::new());
            }
        }
        let cells = self
            .keys
            .iter()
            .map(|key| row.get(key).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        self.rows.push(cells);
        if widened {
            self.rewrite()
        } else {
            self.append_last()
        }
    }
}

#[cfg(test)]
mod test {
    use super::{CsvOutput, HumanOutput, PROGRESS_FILE, TabularLogger, TabularOutput, TabularSink};
    use anyhow::Result;
    use std::collections::BTreeMap;

    fn row(cells: &[(&str, f64)]) -> BTreeMap<String, f64> {
        cells.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn human_output_is_sorted_box() -> Result<()> {
        let mut output = HumanOutput::new(Vec::new());
        output.write_row(&row(&[("total/steps", 200.), ("rollout/return", 10.5)]))?;
        let text = String::from_utf8(output.into_inner())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("| rollout/return"));
        assert!(lines[2].starts_with("| total/steps"));
        assert!(lines[1].ends_with("10.5000 |"));
        Ok(())
    }

    #[test]
    fn csv_widens_header_for_new_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut csv = CsvOutput::new(dir.path())?;
        csv.write_row(&row(&[("a", 1.), ("b", 2.)]))?;
        csv.write_row(&row(&[("a", 3.), ("b", 4.)]))?;
        csv.write_row(&row(&[("a", 5.), ("c", 6.)]))?;
        let text = std::fs::read_to_string(dir.path().join(PROGRESS_FILE))?;
        assert_eq!(text, "a,b,c\n1,2,\n3,4,\n5,,6\n");
        Ok(())
    }

    #[test]
    fn dump_clears_the_row() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut logger =
            TabularLogger::new(Some(dir.path().to_owned())).with_output(CsvOutput::new(dir.path())?);
        logger.record_tabular("x", 1.);
        logger.dump_tabular()?;
        // nothing recorded, nothing written
        logger.dump_tabular()?;
        logger.record_tabular("x", 2.);
        logger.dump_tabular()?;
        let text = std::fs::read_to_string(dir.path().join(PROGRESS_FILE))?;
        assert_eq!(text, "x\n1\n2\n");
        assert_eq!(logger.dir(), Some(dir.path()));
        Ok(())
    }
}
