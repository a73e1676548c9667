//! Write contexts.
//!
//! Every object created in GerryDB is attributed to the write context it was
//! created in. Repositories returned by a [WriteContext] are the only ones
//! that can create or update objects.

use std::cell::Cell;
use std::marker::PhantomData;

use tracing::debug;

use crate::db::GerryDb;
use crate::models::ObjectMeta;
use crate::repos::{
    ColumnRepo,
    ColumnSetRepo,
    GeoLayerRepo,
    GraphRepo,
    LocalityRepo,
    NamespaceRepo,
    PlanRepo,
    ViewRepo,
    ViewTemplateRepo,
    Writable,
};

/// An open write context.
///
/// The context is closed when it is dropped or passed to [WriteContext::close].
/// It is not `Sync`, a context belongs to a single caller.
#[derive(Debug)]
pub struct WriteContext<'db> {
    db: &'db GerryDb,
    meta: ObjectMeta,
    _not_sync: PhantomData<Cell<()>>,
}

impl<'db> WriteContext<'db> {
    pub(crate) fn new(db: &'db GerryDb, meta: ObjectMeta) -> Self {
        debug!(meta_id = %meta.uuid, "opened write context");
        Self {
            db,
            meta,
            _not_sync: PhantomData,
        }
    }

    /// The metadata attached to every object created in this context.
    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    pub fn db(&self) -> &'db GerryDb {
        self.db
    }

    /// Close the context.
    pub fn close(self) {}

    fn access(&self) -> Writable<'_> {
        Writable::new(&self.meta.uuid)
    }

    pub fn namespaces(&self) -> NamespaceRepo<'db, Writable<'_>> {
        NamespaceRepo::new(self.db, self.access())
    }

    pub fn localities(&self) -> LocalityRepo<'db, Writable<'_>> {
        LocalityRepo::new(self.db, self.access())
    }

    pub fn geo_layers(&self) -> GeoLayerRepo<'db, Writable<'_>> {
        GeoLayerRepo::new(self.db, self.access())
    }

    pub fn columns(&self) -> ColumnRepo<'db, Writable<'_>> {
        ColumnRepo::new(self.db, self.access())
    }

    pub fn column_sets(&self) -> ColumnSetRepo<'db, Writable<'_>> {
        ColumnSetRepo::new(self.db, self.access())
    }

    pub fn view_templates(&self) -> ViewTemplateRepo<'db, Writable<'_>> {
        ViewTemplateRepo::new(self.db, self.access())
    }

    pub fn graphs(&self) -> GraphRepo<'db, Writable<'_>> {
        GraphRepo::new(self.db, self.access())
    }

    pub fn plans(&self) -> PlanRepo<'db, Writable<'_>> {
        PlanRepo::new(self.db, self.access())
    }

    pub fn views(&self) -> ViewRepo<'db, Writable<'_>> {
        ViewRepo::new(self.db, self.access())
    }
}

impl Drop for WriteContext<'_> {
    fn drop(&mut self) {
        debug!(meta_id = %self.meta.uuid, "closed write context");
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::test_helpers::{META_ID, mock_db, mock_meta};
    use crate::utils::logging::test_helpers::test_subscriber;

    #[tokio::test]
    async fn context_is_closed_on_drop() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        let db = mock_db(&server);

        let (subscriber, writer) = test_subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);
        {
            let ctx = db.context("notes").await.unwrap();
            assert_eq!(ctx.meta().uuid, META_ID);
        }
        let logs = writer.contents();
        assert!(logs.contains("opened write context"), "{logs}");
        assert!(logs.contains("closed write context"), "{logs}");
        assert!(logs.contains(META_ID), "{logs}");
    }

    #[tokio::test]
    async fn context_is_closed_explicitly() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        let db = mock_db(&server);

        let (subscriber, writer) = test_subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);
        let ctx = db.context("notes").await.unwrap();
        ctx.close();
        assert_eq!(writer.contents().matches("closed write context").count(), 1);
    }
}
