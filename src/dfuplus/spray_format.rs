use std::fmt;
use serde_derive::Deserialize;

use super::Command;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Ascii,
    Utf8,
    Utf8n,
    Utf16,
    Utf16le,
    Utf16be,
    Utf32,
    Utf32le,
    Utf32be,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Ascii => "ascii",
            Encoding::Utf8 => "utf8",
            Encoding::Utf8n => "utf8n",
            Encoding::Utf16 => "utf16",
            Encoding::Utf16le => "utf16le",
            Encoding::Utf16be => "utf16be",
            Encoding::Utf32 => "utf32",
            Encoding::Utf32le => "utf32le",
            Encoding::Utf32be => "utf32be",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum SprayFormat {
    Csv {
        #[serde(default)]
        encoding: Option<Encoding>,
        #[serde(default)]
        max_record_size: Option<u32>,
        #[serde(default)]
        separator: Option<String>,
        #[serde(default)]
        terminator: Option<String>,
        #[serde(default)]
        quote: Option<String>,
    },
    Fixed {
        record_size: u32,
    },
    Json {
        row_path: String,
        #[serde(default)]
        max_record_size: Option<u32>,
    },
    Xml {
        row_tag: String,
        #[serde(default)]
        encoding: Option<Encoding>,
        #[serde(default)]
        max_record_size: Option<u32>,
    },
}

fn add_if_some<T: fmt::Display>(cmd: Command, key: &str, value: &Option<T>) -> Command {
    match value {
        Some(v) => cmd.arg(format!("{}={}", key, v)),
        None => cmd,
    }
}

impl SprayFormat {
    pub fn csv() -> SprayFormat {
        SprayFormat::Csv {
            encoding: None,
            max_record_size: None,
            separator: None,
            terminator: None,
            quote: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SprayFormat::Csv { .. } => "csv",
            SprayFormat::Fixed { .. } => "fixed",
            SprayFormat::Json { .. } => "json",
            SprayFormat::Xml { .. } => "xml",
        }
    }

    pub fn add_arguments(&self, cmd: Command) -> Command {
        let cmd = cmd.arg(format!("format={}", self.name()));
        match self {
            SprayFormat::Csv { encoding, max_record_size, separator, terminator, quote } => {
                let cmd = add_if_some(cmd, "encoding", encoding);
                let cmd = add_if_some(cmd, "maxrecordsize", max_record_size);
                let cmd = add_if_some(cmd, "separator", separator);
                let cmd = add_if_some(cmd, "terminator", terminator);
                add_if_some(cmd, "quote", quote)
            },
            SprayFormat::Fixed { record_size } => cmd.arg(format!("recordsize={}", record_size)),
            SprayFormat::Json { row_path, max_record_size } => {
                let cmd = cmd.arg(format!("rowpath={}", row_path));
                add_if_some(cmd, "maxrecordsize", max_record_size)
            },
            SprayFormat::Xml { row_tag, encoding, max_record_size } => {
                let cmd = cmd.arg(format!("rowtag={}", row_tag));
                let cmd = add_if_some(cmd, "encoding", encoding);
                add_if_some(cmd, "maxrecordsize", max_record_size)
            },
        }
    }
}
