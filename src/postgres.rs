//! [`Writer`] backed by PostgreSQL through `tokio-postgres`.
//!
//! Every session is its own connection, driven by a spawned task. Each write
//! is a single-row autocommitted insert into the `queue` table.

use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Statement};

use crate::writer::{Writer, WriterError};

const INSERT: &str = "insert into queue (data) values ($1)";
const CREATE: &str = "create table if not exists queue (
    id bigserial primary key,
    data text not null
)";

pub struct PostgresWriter {
    url: String,
}

pub struct PostgresSession {
    client: Client,
    insert: Statement,
    driver: JoinHandle<Result<(), tokio_postgres::Error>>,
}

impl PostgresWriter {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Create the `queue` table if it does not exist yet.
    pub async fn create_table(&self) -> Result<(), WriterError> {
        let session = self.open().await?;
        let res = session
            .client
            .batch_execute(CREATE)
            .await
            .map_err(|e| WriterError::Write(e.to_string()));
        // a close failure here is as harmless as at the end of a burst
        let _ = self.close(session).await;
        res
    }
}

impl Writer for PostgresWriter {
    type Session = PostgresSession;

    async fn open(&self) -> Result<PostgresSession, WriterError> {
        let connect = |e: tokio_postgres::Error| WriterError::Connect(e.to_string());

        let (client, connection) = tokio_postgres::connect(&self.url, NoTls)
            .await
            .map_err(connect)?;
        let driver = tokio::spawn(connection);

        client.execute("select 1", &[]).await.map_err(connect)?;
        let insert = client.prepare(INSERT).await.map_err(connect)?;
        Ok(PostgresSession {
            client,
            insert,
            driver,
        })
    }

    async fn write(&self, session: &mut PostgresSession, seq: u64) -> Result<(), WriterError> {
        session
            .client
            .execute(&session.insert, &[&seq.to_string()])
            .await
            .map_err(|e| WriterError::Write(e.to_string()))?;
        Ok(())
    }

    async fn close(&self, session: PostgresSession) -> Result<(), WriterError> {
        let PostgresSession { client, driver, .. } = session;
        // dropping the client ends the connection task
        drop(client);
        match driver.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WriterError::Close(e.to_string())),
            Err(e) => Err(WriterError::Close(e.to_string())),
        }
    }
}
