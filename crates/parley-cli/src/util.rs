use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use crate::schema::scenario::Scenario;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    /// Writes `value` as pretty JSON to `output_path`, or to stdout if no path is given.
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = match output_path {
            Some(path) => Output::create(path)?,
            None => Output::Stdout {
                writer: io::stdout().lock(),
            },
        };
        output.write_json(value)?;
        if let Output::File { path, .. } = &output {
            info!(path = %path.display(), "saved report");
        }
        Ok(())
    }

    fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    fn target(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, value)
            .with_context(|| format!("Failed to write JSON to {}", self.target()))?;
        writeln!(self)
            .and_then(|()| self.flush())
            .with_context(|| format!("Failed to finish writing to {}", self.target()))
    }
}

impl Output {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Output::Stdout { writer } => writer,
            Output::File { writer, .. } => writer,
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer().flush()
    }
}

/// Reads a JSON document of the given kind ("scenario", ...) from `path`.
fn read_json<T>(kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {kind} file: {}", path.display()))?;
    debug!(kind, path = %path.display(), bytes = text.len(), "read JSON file");
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {kind} JSON file: {}", path.display()))
}

/// Reads and validates a scenario file.
pub fn read_scenario_file<P>(path: P) -> anyhow::Result<Scenario>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let scenario: Scenario = read_json("scenario", path)?;
    scenario
        .validate()
        .with_context(|| format!("Invalid scenario: {}", path.display()))?;
    Ok(scenario)
}

/// Creates the random generator of a run, drawing a fresh seed if none is given.
///
/// Returns the seed as well so it can be recorded for reproduction.
pub fn seeded_rng(seed: Option<u64>) -> (u64, Pcg32) {
    let seed = seed.unwrap_or_else(rand::random);
    info!(seed, "seeding random number generator");
    (seed, Pcg32::seed_from_u64(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../scenarios/party.json");

    #[test]
    fn test_reads_bundled_scenario() {
        let scenario = read_scenario_file(PARTY).unwrap();
        assert_eq!(scenario.agent.as_str(), "me");
    }

    #[test]
    fn test_missing_scenario_names_the_file() {
        let err = read_scenario_file("no/such/scenario.json").unwrap_err();
        assert!(format!("{err:#}").contains("no/such/scenario.json"));
    }

    #[test]
    fn test_saves_json_to_file() {
        let path = std::env::temp_dir().join(format!("parley-output-{}.json", std::process::id()));
        Output::save_json(&serde_json::json!({ "round": 3 }), Some(path.clone())).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(written["round"], 3);
    }
}
