//! MySQL and SingleStore through `mysql_async`.

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, SslOpts, Value};

use super::{Client, mask_url};
use crate::config::{MysqlSsl, MysqlSslOptions};
use crate::credentials::MysqlCredentials;
use crate::error::{Error, Result};

const DEFAULT_PORT: u16 = 3306;

struct MysqlClient {
    rt: tokio::runtime::Runtime,
    conn: Option<Conn>,
}

pub(super) fn open(creds: &MysqlCredentials) -> Result<Box<dyn Client>> {
    let (opts, display) = opts(creds)?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Connection(format!("Failed to create async runtime: {}", e)))?;

    let conn = rt.block_on(Conn::new(opts)).map_err(|e| {
        Error::Connection(format!("Failed to connect to MySQL at {}: {}", display, e))
    })?;

    Ok(Box::new(MysqlClient {
        rt,
        conn: Some(conn),
    }))
}

fn opts(creds: &MysqlCredentials) -> Result<(Opts, String)> {
    match creds {
        MysqlCredentials::Url { url } => {
            let opts = Opts::from_url(url)
                .map_err(|e| Error::Connection(format!("Invalid MySQL URL: {}", e)))?;
            Ok((opts, mask_url(url)))
        }
        MysqlCredentials::Host {
            host,
            port,
            user,
            password,
            database,
            ssl,
        } => {
            let port = port.unwrap_or(DEFAULT_PORT);
            let mut builder = OptsBuilder::default()
                .ip_or_hostname(&**host)
                .tcp_port(port)
                .user(user.as_deref())
                .pass(password.as_deref())
                .db_name(Some(&**database));
            if let Some(ssl) = ssl_opts(ssl.as_ref()) {
                builder = builder.ssl_opts(ssl);
            }
            Ok((builder.into(), format!("{host}:{port}/{database}")))
        }
    }
}

/// Named profiles (e.g. "Amazon RDS") enable TLS with the system roots.
/// Certificate material in the options form is not loaded.
fn ssl_opts(ssl: Option<&MysqlSsl>) -> Option<SslOpts> {
    match ssl? {
        MysqlSsl::Profile(_) => Some(SslOpts::default()),
        MysqlSsl::Options(options) => {
            let MysqlSslOptions {
                ca,
                cert,
                key,
                pfx,
                reject_unauthorized,
                ..
            } = options;
            if ca.is_some() || cert.is_some() || key.is_some() || pfx.is_some() {
                tracing::warn!("MySQL ssl certificate options are ignored; using system roots");
            }
            let accept_invalid = matches!(reject_unauthorized, Some(false));
            Some(SslOpts::default().with_danger_accept_invalid_certs(accept_invalid))
        }
    }
}

impl Client for MysqlClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        let rt = &self.rt;
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        rt.block_on(conn.query_drop(sql))
            .map_err(|e| Error::query(sql, e))
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        let rt = &self.rt;
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let rows: Vec<mysql_async::Row> = rt
            .block_on(conn.query(sql))
            .map_err(|e| Error::query(sql, e))?;
        Ok(rows
            .iter()
            .map(|row| row.as_ref(0).map(text).unwrap_or_default())
            .collect())
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        self.rt
            .block_on(conn.disconnect())
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

fn closed() -> Error {
    Error::Connection("connection already closed".into())
}

fn text(value: &Value) -> String {
    match value {
        Value::NULL => String::new(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        other => other.as_sql(true).trim_matches('\'').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_as_text() {
        assert_eq!(text(&Value::NULL), "");
        assert_eq!(text(&Value::Bytes(b"users".to_vec())), "users");
        assert_eq!(text(&Value::Int(-3)), "-3");
        assert_eq!(text(&Value::UInt(12)), "12");
    }

    #[test]
    fn ssl_profiles_and_options() {
        assert!(ssl_opts(None).is_none());
        assert!(ssl_opts(Some(&MysqlSsl::Profile("Amazon RDS".into()))).is_some());

        let relaxed = MysqlSsl::Options(MysqlSslOptions {
            reject_unauthorized: Some(false),
            ..Default::default()
        });
        let opts = ssl_opts(Some(&relaxed)).unwrap();
        assert!(opts.accept_invalid_certs());
    }

    #[test]
    fn host_form_display_hides_password() {
        let creds = MysqlCredentials::Host {
            host: "db".into(),
            port: None,
            user: Some("root".into()),
            password: Some("secret".into()),
            database: "app".into(),
            ssl: None,
        };
        let (opts, display) = opts(&creds).unwrap();
        assert_eq!(display, "db:3306/app");
        assert_eq!(opts.tcp_port(), 3306);
        assert_eq!(opts.db_name(), Some("app"));
    }
}
