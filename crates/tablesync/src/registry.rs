//! Repository registry: bulk sync and uninstall over registered tables.
//!
//! A host registers one repository per table at startup, then calls
//! [`Registry::sync_all`] once (or [`Registry::uninstall_all`] at teardown).
//! Repositories run in registration order and the first failure stops the
//! batch.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tracing::{error, info};

use crate::connection::Connection;
use crate::engine::{Reconciler, SyncOutcome};
use crate::error::Result;
use crate::record::Record;

/// A unit the registry can sync and uninstall.
pub trait Repository<C: Connection> {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Brings the repository's table in line with its declaration.
    fn sync<'a>(&'a self, conn: &'a C) -> LocalBoxFuture<'a, Result<SyncOutcome>>;

    /// Removes the repository's table and the foreign keys touching it.
    fn uninstall<'a>(&'a self, conn: &'a C) -> LocalBoxFuture<'a, Result<()>>;
}

/// The repository of one record type, with the records to seed a newly
/// created table with.
#[derive(Debug, Clone)]
pub struct RecordRepository<R> {
    seed: Vec<R>,
}

impl<R: Record> RecordRepository<R> {
    /// A repository with no seed records.
    #[must_use]
    pub const fn new() -> Self {
        Self { seed: Vec::new() }
    }

    /// A repository seeding a newly created table with `seed`.
    #[must_use]
    pub const fn with_seed(seed: Vec<R>) -> Self {
        Self { seed }
    }
}

impl<R: Record> Default for RecordRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C> Repository<C> for RecordRepository<R>
where
    R: Record + Clone,
    C: Connection,
{
    fn name(&self) -> &str {
        R::TABLE
    }

    fn sync<'a>(&'a self, conn: &'a C) -> LocalBoxFuture<'a, Result<SyncOutcome>> {
        async move { Reconciler::new(conn).sync::<R>(self.seed.clone()).await }.boxed_local()
    }

    fn uninstall<'a>(&'a self, conn: &'a C) -> LocalBoxFuture<'a, Result<()>> {
        async move { Reconciler::new(conn).uninstall::<R>().await }.boxed_local()
    }
}

/// Registered repositories, in registration order.
pub struct Registry<C: Connection> {
    repositories: Vec<Box<dyn Repository<C>>>,
}

impl<C: Connection> Registry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            repositories: Vec::new(),
        }
    }

    /// Registers a repository.
    pub fn register(&mut self, repository: impl Repository<C> + 'static) -> &mut Self {
        self.repositories.push(Box::new(repository));
        self
    }

    /// Registers the repository of record type `R` with seed records.
    pub fn register_record<R>(&mut self, seed: Vec<R>) -> &mut Self
    where
        R: Record + Clone + 'static,
    {
        self.register(RecordRepository::with_seed(seed))
    }

    /// Registered repository names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.name()).collect()
    }

    /// Number of registered repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Syncs every repository in registration order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing repository and returns its error
    /// unchanged. Repositories synced before it stay synced.
    pub async fn sync_all(&self, conn: &C) -> Result<Vec<(String, SyncOutcome)>> {
        let mut outcomes = Vec::with_capacity(self.repositories.len());
        for repository in &self.repositories {
            match repository.sync(conn).await {
                Ok(outcome) => outcomes.push((repository.name().to_string(), outcome)),
                Err(e) => {
                    error!(repository = repository.name(), error = %e, "Sync failed");
                    return Err(e);
                }
            }
        }
        info!(count = outcomes.len(), "All repositories synced");
        Ok(outcomes)
    }

    /// Uninstalls every repository in registration order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing repository and returns its error
    /// unchanged.
    pub async fn uninstall_all(&self, conn: &C) -> Result<()> {
        for repository in &self.repositories {
            if let Err(e) = repository.uninstall(conn).await {
                error!(repository = repository.name(), error = %e, "Uninstall failed");
                return Err(e);
            }
        }
        info!(count = self.repositories.len(), "All repositories uninstalled");
        Ok(())
    }
}

impl<C: Connection> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}
