use std::{fmt, str::FromStr};

use crate::config::{Lookup as LookupConfig, SUBJECT_PLACEHOLDER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Ipshudi,
    Ip138,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Ipshudi, Source::Ip138];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ipshudi => "ipshudi",
            Source::Ip138 => "ip138",
        }
    }

    fn template<'a>(&self, config: &'a LookupConfig) -> &'a str {
        match self {
            Source::Ipshudi => &config.ipshudi_url,
            Source::Ip138 => &config.ip138_url,
        }
    }

    pub fn url(&self, config: &LookupConfig, subject: &str) -> String {
        self.template(config).replace(SUBJECT_PLACEHOLDER, subject)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a history record: a concrete source, or the winner of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Source(Source),
    Fastest,
}

impl SourceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::Source(source) => source.as_str(),
            SourceKey::Fastest => "fastest",
        }
    }
}

impl From<Source> for SourceKey {
    fn from(source: Source) -> Self {
        SourceKey::Source(source)
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipshudi" => Ok(SourceKey::Source(Source::Ipshudi)),
            "ip138" => Ok(SourceKey::Source(Source::Ip138)),
            "fastest" => Ok(SourceKey::Fastest),
            other => Err(format!("unknown source key {other:?}")),
        }
    }
}
