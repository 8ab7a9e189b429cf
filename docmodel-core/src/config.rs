//! Connection-target resolution.
//!
//! The target is picked from the environment in a fixed order:
//!
//! 1. `DATABASE` (or `database`), used verbatim;
//! 2. the cluster address when all of `MONGODB_MONGO_CLUSTER_1_PORT`,
//!    `MONGODB_MONGO_CLUSTER_2_PORT` and `MONGODB_MONGO_CLUSTER_3_PORT` are set;
//! 3. `DATABASE_PORT` (or `database_port`) with its scheme stripped and `/database` appended;
//! 4. `localhost/database`.
//!
//! Empty variables count as unset.

use std::{env, fmt};

/// Database name used when the target does not name one.
pub const DEFAULT_DATABASE: &str = "database";

/// Target used when nothing is configured.
pub const LOCAL_TARGET: &str = "localhost/database";

/// Target used inside the three-node cluster deployment.
pub const CLUSTER_TARGET: &str = "mongodb://mongodb_mongo-cluster_1/database";

const CLUSTER_PORT_VARS: [&str; 3] = [
    "MONGODB_MONGO_CLUSTER_1_PORT",
    "MONGODB_MONGO_CLUSTER_2_PORT",
    "MONGODB_MONGO_CLUSTER_3_PORT",
];

const SCHEME: &str = "mongodb://";

/// Which rule produced a [`ConnectionTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    Explicit,
    Cluster,
    HostPort,
    LocalDefault,
}

/// A resolved database connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    target: String,
    source: TargetSource,
}

impl ConnectionTarget {
    /// Resolves the target from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|name| env::var(name).ok())
    }

    /// Resolves the target through `lookup`, which maps a variable name to its value.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|value| !value.is_empty())
        };

        if let Some(target) = var(&["DATABASE", "database"]) {
            return Self { target, source: TargetSource::Explicit };
        }

        if CLUSTER_PORT_VARS
            .iter()
            .all(|name| var(&[*name]).is_some())
        {
            return Self {
                target: CLUSTER_TARGET.to_string(),
                source: TargetSource::Cluster,
            };
        }

        if let Some(address) = var(&["DATABASE_PORT", "database_port"]) {
            let host = address
                .split_once("://")
                .map_or(address.as_str(), |(_, rest)| rest);

            return Self {
                target: format!("{host}/{DEFAULT_DATABASE}"),
                source: TargetSource::HostPort,
            };
        }

        Self {
            target: LOCAL_TARGET.to_string(),
            source: TargetSource::LocalDefault,
        }
    }

    /// The target as resolved, possibly without a scheme.
    pub fn as_str(&self) -> &str {
        &self.target
    }

    pub fn source(&self) -> TargetSource {
        self.source
    }

    /// The target as a connection URI, with the `mongodb://` scheme added when missing.
    pub fn uri(&self) -> String {
        if self.target.contains("://") {
            self.target.clone()
        } else {
            format!("{SCHEME}{}", self.target)
        }
    }

    /// The database named by the target's path, or [`DEFAULT_DATABASE`].
    pub fn database(&self) -> &str {
        let rest = self
            .target
            .split_once("://")
            .map_or(self.target.as_str(), |(_, rest)| rest);

        rest.split_once('/')
            .map(|(_, path)| path.split(['?', '/']).next().unwrap_or_default())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DATABASE)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}
