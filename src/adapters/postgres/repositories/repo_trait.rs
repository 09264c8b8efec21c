use super::super::specifications::Specification;
use super::includes::IncludePath;
use super::unit_of_work::{PendingId, UnitOfWork};
use crate::dtos::paging::{Listing, PageRequest};
use crate::errors::RepoError;

/// Generic data access for one entity type. Implementations are stateless;
/// every operation goes through the unit of work that owns the session, so
/// all staged mutations end up in its single buffer.
///
/// `insert`, `update` and `delete` only stage: nothing touches the store
/// until [`UnitOfWork::save`] commits the whole batch atomically.
pub trait Repository: Send + Sync + 'static {
    type CreateDto;
    type Dto;
    type Spec: Specification;
    type Include: IncludePath;

    const ENTITY: &'static str;

    /// Full sequence when `page` is `None`, otherwise one window plus the
    /// unpaged total. Rows come back in primary-key order.
    async fn get_all(
        page: Option<&PageRequest>,
        includes: &[Self::Include],
        uow: &mut UnitOfWork,
    ) -> Result<Listing<Self::Dto>, RepoError>;

    /// At most one match; absence is a normal outcome, not an error.
    async fn get_one_by(
        spec: Self::Spec,
        includes: &[Self::Include],
        uow: &mut UnitOfWork,
    ) -> Result<Option<Self::Dto>, RepoError>;

    /// Count for the given filter, independent of any paging window.
    async fn get_count(
        spec: Option<&Self::Spec>,
        uow: &mut UnitOfWork,
    ) -> Result<i64, RepoError>;

    /// Stages an insert. The returned slot holds the storage-assigned id
    /// once `save` commits; before that it reads as `None`.
    fn insert(dto: &Self::CreateDto, uow: &mut UnitOfWork) -> PendingId;

    /// Stages an update for an already-identified entity. A no-op update is
    /// allowed and never fails.
    fn update(dto: &Self::Dto, uow: &mut UnitOfWork);

    /// Stages a removal by id. If the id matches nothing, `save` fails with
    /// `NotFound` and rolls the whole batch back.
    fn delete(id: i32, uow: &mut UnitOfWork);
}
