//! Implementation of the `encode` command
use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use lp_writer::{
    Batch, IoTransport, LineProtocolEncoder, MockProvider, Precision, SystemProvider, Time,
    TimeProvider, WriteError, WriteOutcome, Writer, WriterOptions,
};
use tracing::{debug, info};

const STDIN: &str = "-";

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("error reading input '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error opening output '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error decoding batches from '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: lp_writer::Error,
    },

    #[error("error writing batch #{index} of '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        index: usize,
        #[source]
        source: WriteError<io::Error>,
    },
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    writer_config: WriterConfig,

    /// Write line protocol to this file instead of stdout
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// JSON files to encode, each holding one batch or an array of batches.
    ///
    /// Reads stdin when no file is given, or for `-`.
    #[clap(value_name = "FILES")]
    files: Vec<PathBuf>,
}

/// Options applied to every batch that is encoded
#[derive(Debug, Clone, clap::Parser)]
pub(crate) struct WriterConfig {
    /// Default tag added to every line, as `key=value`. Batch tags of the same key are
    /// overridden, point tags are not.
    #[clap(
        short = 't',
        long = "tag",
        env = "INFLUXDB_LP_TAGS",
        value_delimiter = ',',
        value_parser = parse_key_value,
    )]
    tags: Vec<(String, String)>,

    /// Suffix integer field values with `i`, so they are stored as integers
    #[clap(long = "force-integers", env = "INFLUXDB_LP_FORCE_INTEGERS")]
    force_integers: bool,

    /// Unit timestamps are written in: ns, us, ms or s
    #[clap(long = "precision", env = "INFLUXDB_LP_PRECISION", default_value = "ns")]
    precision: Precision,

    /// Escape special characters in measurements, tags, field keys and string values
    #[clap(long = "escape", env = "INFLUXDB_LP_ESCAPE")]
    escape: bool,

    /// Write each line's tags sorted by key
    #[clap(long = "sort-tags", env = "INFLUXDB_LP_SORT_TAGS")]
    sort_tags: bool,

    /// Timestamp for batches and points that carry none, in place of the current time.
    ///
    /// Accepts RFC3339, ISO 8601 with a `+hhmm` offset, RFC 2822, `YYYY-MM-DD HH:MM[:SS]` (UTC),
    /// `YYYY-MM-DD` or `@<unix seconds>`.
    #[clap(long = "time", env = "INFLUXDB_LP_TIME", value_parser = Time::parse)]
    time: Option<Time>,
}

impl WriterConfig {
    fn writer_options(&self) -> WriterOptions {
        let options = self
            .tags
            .iter()
            .fold(WriterOptions::new(), |options, (k, v)| {
                options.with_tag(k.as_str(), v.as_str())
            });

        options
            .with_force_integers(self.force_integers)
            .with_precision(self.precision)
            .with_escaping(self.escape)
            .with_sorted_tags(self.sort_tags)
    }

    fn time_provider(&self) -> Arc<dyn TimeProvider> {
        match self.time {
            Some(time) => Arc::new(MockProvider::new(time)),
            None => Arc::new(SystemProvider::new()),
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid tag '{s}', expected key=value")),
    }
}

/// Where encoded line protocol goes
#[derive(Debug)]
enum Output {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl Output {
    fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::Stdout(io::stdout())),
            Some(path) => File::create(path)
                .map(|file| Self::File(BufWriter::new(file)))
                .map_err(|source| Error::Output {
                    path: path.to_path_buf(),
                    source,
                }),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::File(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::File(out) => out.flush(),
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    let mut contents = String::new();
    let res = if path == Path::new(STDIN) {
        io::stdin().read_to_string(&mut contents).map(|_| ())
    } else {
        File::open(path).and_then(|mut f| f.read_to_string(&mut contents).map(|_| ()))
    };
    res.map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents)
}

pub(crate) fn command(config: Config) -> Result<()> {
    let Config {
        writer_config,
        output,
        mut files,
    } = config;

    if files.is_empty() {
        files.push(PathBuf::from(STDIN));
    }

    let encoder = LineProtocolEncoder::new(
        writer_config.writer_options(),
        writer_config.time_provider(),
    );
    let writer = Writer::new(
        encoder,
        IoTransport::new(Output::open(output.as_deref())?),
    );

    let mut total_lines = 0;
    let mut skipped = 0;
    for path in &files {
        let contents = read_input(path)?;
        let batches = Batch::list_from_json(&contents).map_err(|source| Error::Decode {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), batches = batches.len(), "decoded input");

        for (index, batch) in batches.iter().enumerate() {
            match writer.write(batch).map_err(|source| Error::Write {
                path: path.clone(),
                index,
                source,
            })? {
                WriteOutcome::Sent { lines, .. } => total_lines += lines,
                WriteOutcome::NoOutput => {
                    info!(path = %path.display(), index, "batch has no points, skipped");
                    skipped += 1;
                }
            }
        }
    }

    info!(files = files.len(), lines = total_lines, skipped, "encode complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lp_writer::{Point, Tags};
    use pretty_assertions::assert_eq;

    fn writer_config(args: &[&str]) -> WriterConfig {
        WriterConfig::try_parse_from(std::iter::once("encode").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn key_value() {
        assert_eq!(
            parse_key_value("host=a").unwrap(),
            ("host".to_string(), "a".to_string())
        );
        assert_eq!(
            parse_key_value("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("host").is_err());
        assert!(parse_key_value("=a").is_err());
    }

    #[test]
    fn defaults() {
        let options = writer_config(&[]).writer_options();

        assert_eq!(options, WriterOptions::new());
    }

    #[test]
    fn options_from_flags() {
        let config = writer_config(&[
            "--tag",
            "region=eu",
            "-t",
            "env=prod,dc=ams",
            "--force-integers",
            "--precision",
            "ms",
            "--escape",
            "--sort-tags",
        ]);
        let options = config.writer_options();

        let expected: Tags = [("region", "eu"), ("env", "prod"), ("dc", "ams")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(options.default_tags(), &expected);
        assert!(options.force_integers());
        assert_eq!(options.precision(), Precision::Millisecond);
        assert!(options.escape_special_characters());
        assert!(options.sort_tags());
    }

    #[test]
    fn fixed_time() {
        let config = writer_config(&["--time", "2020-01-01 00:00:00"]);
        let encoder =
            LineProtocolEncoder::new(config.writer_options(), config.time_provider());

        let lp = encoder
            .encode(&Batch::new(vec![Point::new("m").field("x", 1)]))
            .unwrap()
            .unwrap();

        assert_eq!(lp, "m x=1 1577836800000000000");
    }

    #[test]
    fn invalid_flags() {
        let parse = |args: &[&str]| {
            WriterConfig::try_parse_from(std::iter::once("encode").chain(args.iter().copied()))
        };

        assert!(parse(&["--tag", "novalue"]).is_err());
        assert!(parse(&["--precision", "hours"]).is_err());
        assert!(parse(&["--time", "yesterday"]).is_err());
    }
}
