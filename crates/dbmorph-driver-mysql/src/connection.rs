//! MySQL connection implementation

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row, prelude::*};

use dbmorph_core::{MorphError, Result, StatementExecutor};


const DEFAULT_PORT: u16 = 3306;
const DEFAULT_USER: &str = "root";
const URL_SCHEME: &str = "mysql://";

/// Parsed form of `[mysql://][user[:password]@]host[:port]/database`
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl ConnectionParams {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            MorphError::Connection(format!(
                "invalid connection string ({}), expected user:password@host:port/database",
                reason
            ))
        };

        let rest = input.trim();
        let rest = rest.strip_prefix(URL_SCHEME).unwrap_or(rest);

        // Passwords may contain '@', hosts may not
        let (credentials, location) = match rest.rsplit_once('@') {
            Some((credentials, location)) => (Some(credentials), location),
            None => (None, rest),
        };

        let (user, password) = match credentials {
            Some(credentials) => match credentials.split_once(':') {
                Some((user, password)) => (user, Some(password)),
                None => (credentials, None),
            },
            None => ("", None),
        };

        let (address, database) = location
            .split_once('/')
            .ok_or_else(|| invalid("missing database"))?;
        let database = database.trim_end_matches('/');
        if database.is_empty() {
            return Err(invalid("missing database"));
        }

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid("bad port"))?;
                (host, port)
            }
            None => (address, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            user: if user.is_empty() {
                DEFAULT_USER.to_string()
            } else {
                user.to_string()
            },
            password: password.filter(|p| !p.is_empty()).map(str::to_string),
            host: host.to_string(),
            port,
            database: database.to_string(),
        })
    }

    fn opts(&self) -> Result<Opts> {
        let constraints = PoolConstraints::new(1, 1).ok_or_else(|| {
            MorphError::Connection("failed to configure MySQL pool constraints (min=1, max=1)".into())
        })?;
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);

        let builder = OptsBuilder::default()
            .ip_or_hostname(self.host.as_str())
            .tcp_port(self.port)
            .user(Some(self.user.as_str()))
            .pass(self.password.as_deref())
            .db_name(Some(self.database.as_str()))
            .pool_opts(pool_opts);

        Ok(builder.into())
    }
}

impl FromStr for ConnectionParams {
    type Err = MorphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Displays without the password so it can go into logs
impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// MySQL connection wrapper
///
/// Holds a single-connection pool so that statements run strictly one after
/// another on the same session.
pub struct MySqlConnection {
    pool: Pool,
    database: String,
}

impl MySqlConnection {
    /// Connect using a connection string
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(&ConnectionParams::parse(url)?).await
    }

    #[tracing::instrument(skip_all, fields(host = %params.host, port = params.port, database = %params.database))]
    pub async fn connect_with(params: &ConnectionParams) -> Result<Self> {
        tracing::info!("connecting to MySQL database");

        let pool = Pool::new(params.opts()?);

        // Verify connectivity by acquiring and releasing a connection
        let conn = pool
            .get_conn()
            .await
            .map_err(|e| MorphError::Connection(format!("failed to connect to MySQL: {}", e)))?;
        drop(conn);

        tracing::info!(target_db = %params, "MySQL connection established");
        Ok(Self {
            pool,
            database: params.database.clone(),
        })
    }

    /// Name of the database this connection is bound to
    pub fn database(&self) -> &str {
        &self.database
    }

    async fn get_conn(&self) -> Result<Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| MorphError::Connection(format!("failed to get MySQL connection: {}", e)))
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    pub(crate) async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let mut conn = self.get_conn().await?;
        let rows: Vec<Row> = conn
            .query(sql)
            .await
            .map_err(|e| MorphError::Query(format!("failed to execute query: {}", e)))?;
        tracing::trace!(rows = rows.len(), "query complete");
        Ok(rows)
    }

    /// Closes the pool, waiting for the connection to be released
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .map_err(|e| MorphError::Connection(format!("failed to disconnect: {}", e)))
    }
}

#[async_trait]
impl StatementExecutor for MySqlConnection {
    #[tracing::instrument(skip(self, statement), fields(sql_preview = %statement.chars().take(100).collect::<String>()))]
    async fn execute(&self, statement: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        conn.query_drop(statement)
            .await
            .map_err(|e| MorphError::Query(e.to_string()))?;
        tracing::debug!(affected_rows = conn.affected_rows(), "statement executed");
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "mysql"
    }
}
