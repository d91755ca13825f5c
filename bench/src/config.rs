//! Bench settings.
//!
//! Each integer setting has a default and an allowed range. Resolution order
//! is default, then environment variable, then positional CLI argument;
//! every override is range-checked.

use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: cannot parse {value:?} as an unsigned integer")]
    Parse { name: &'static str, value: String },

    #[error("{name}: {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("unknown mode {0:?}, use --help for options")]
    UnknownMode(String),

    #[error("unexpected argument {0:?}")]
    UnexpectedArgument(String),
}

/// A bounded integer setting.
#[derive(Debug, Clone, Copy)]
pub struct IntSetting {
    pub name: &'static str,
    pub env: &'static str,
    pub description: &'static str,
    pub default: u64,
    pub min: u64,
    pub max: u64,
}

pub const NODE_COUNT: IntSetting = IntSetting {
    name: "node_count",
    env: "PROCGRAPH_BENCH_NODE_COUNT",
    description: "Target number of nodes (or bundle elements) per generator",
    default: 200_000,
    min: 16,
    max: 50_000_000,
};

pub const SEED: IntSetting = IntSetting {
    name: "seed",
    env: "PROCGRAPH_BENCH_SEED",
    description: "Base seed for the generators' random number streams",
    default: 42,
    min: 0,
    max: u64::MAX,
};

pub const QUERIES: IntSetting = IntSetting {
    name: "queries",
    env: "PROCGRAPH_BENCH_QUERIES",
    description: "Random start/end pairs timed per path procedure",
    default: 100,
    min: 1,
    max: 100_000,
};

pub const ALL_SETTINGS: [IntSetting; 3] = [NODE_COUNT, SEED, QUERIES];

impl IntSetting {
    pub fn parse(&self, raw: &str) -> Result<u64, ConfigError> {
        let value: u64 = raw.trim().parse().map_err(|_| ConfigError::Parse {
            name: self.name,
            value: raw.to_string(),
        })?;
        if value < self.min || value > self.max {
            return Err(ConfigError::OutOfRange {
                name: self.name,
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }

    /// Default, overridden by the environment, overridden by `cli`.
    fn resolve<V>(&self, env: &V, cli: Option<&str>) -> Result<u64, ConfigError>
    where
        V: Fn(&str) -> Option<String>,
    {
        let mut value = self.default;
        if let Some(raw) = env(self.env) {
            value = self.parse(&raw)?;
        }
        if let Some(raw) = cli {
            value = self.parse(raw)?;
        }
        Ok(value)
    }
}

/// Synthetic graph topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    LSystem,
    ScaleFree,
    SmallWorld,
    Random,
    Barbell,
    Dla,
}

impl Topology {
    pub const ALL: [Topology; 6] = [
        Topology::LSystem,
        Topology::ScaleFree,
        Topology::SmallWorld,
        Topology::Random,
        Topology::Barbell,
        Topology::Dla,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Topology::LSystem => "L-system tree",
            Topology::ScaleFree => "Scale-free (edge sampling)",
            Topology::SmallWorld => "Small-world (Watts-Strogatz)",
            Topology::Random => "Erdos-Renyi random",
            Topology::Barbell => "Barbell (clique-bridge-clique)",
            Topology::Dla => "DLA (organic branching)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every topology, then the facet bundle.
    All,
    Graph(Topology),
    Facets,
    Help,
}

impl Mode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(match raw {
            "all" => Mode::All,
            "lsystem" => Mode::Graph(Topology::LSystem),
            "scalefree" => Mode::Graph(Topology::ScaleFree),
            "smallworld" => Mode::Graph(Topology::SmallWorld),
            "random" => Mode::Graph(Topology::Random),
            "barbell" => Mode::Graph(Topology::Barbell),
            "dla" => Mode::Graph(Topology::Dla),
            "facets" => Mode::Facets,
            "help" | "--help" | "-h" => Mode::Help,
            other => return Err(ConfigError::UnknownMode(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,
    pub node_count: u64,
    pub seed: u64,
    pub queries: u64,
    /// Print one JSON report instead of tables.
    pub json: bool,
}

impl Settings {
    /// Build settings from the process environment and command line.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Build settings from `args` (program name excluded) and an environment
    /// lookup.
    pub fn resolve<I, V>(args: I, env: V) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        V: Fn(&str) -> Option<String>,
    {
        let mut json = false;
        let mut help = false;
        let mut positional = Vec::new();
        for arg in args {
            match arg.as_str() {
                "--json" => json = true,
                "--help" | "-h" => help = true,
                _ => positional.push(arg),
            }
        }
        if help {
            positional = vec!["help".to_string()];
        }
        if positional.len() > 2 {
            return Err(ConfigError::UnexpectedArgument(positional.swap_remove(2)));
        }
        let mut positional = positional.into_iter();

        let mode = match positional.next() {
            Some(raw) => Mode::parse(&raw)?,
            None => Mode::All,
        };
        let node_count_arg = positional.next();

        Ok(Self {
            mode,
            node_count: NODE_COUNT.resolve(&env, node_count_arg.as_deref())?,
            seed: SEED.resolve(&env, None)?,
            queries: QUERIES.resolve(&env, None)?,
            json,
        })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node_count={} seed={} queries={}",
            self.node_count, self.seed, self.queries
        )
    }
}
