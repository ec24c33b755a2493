//! Test doubles shared by the unit and router tests.

use std::io;

use poll_core::{
  response::{NewResponse, Response},
  schema::Shape,
  store::{ResponseFilter, ResponseStore, ResponseUpdate},
};

/// A store whose backing database cannot be reached. Every call fails with
/// [`poll_core::Error::StoreUnavailable`].
pub(crate) struct UnavailableStore(Shape);

impl UnavailableStore {
  pub(crate) fn new() -> Self { Self(Shape::current()) }

  fn down() -> poll_core::Error {
    poll_core::Error::StoreUnavailable(
      io::Error::new(io::ErrorKind::ConnectionRefused, "database is locked").into(),
    )
  }
}

impl ResponseStore for UnavailableStore {
  type Error = poll_core::Error;

  fn shape(&self) -> &Shape { &self.0 }

  async fn insert(&self, _candidate: NewResponse) -> Result<Response, Self::Error> {
    Err(Self::down())
  }

  async fn get(&self, _id: i64) -> Result<Response, Self::Error> { Err(Self::down()) }

  async fn list(&self, _filter: ResponseFilter) -> Result<Vec<Response>, Self::Error> {
    Err(Self::down())
  }

  async fn update(
    &self,
    _id: i64,
    _update: ResponseUpdate,
  ) -> Result<Response, Self::Error> {
    Err(Self::down())
  }

  async fn delete(&self, _id: i64) -> Result<(), Self::Error> { Err(Self::down()) }

  async fn count(&self, _filter: ResponseFilter) -> Result<u64, Self::Error> {
    Err(Self::down())
  }
}
