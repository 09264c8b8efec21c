mod countries;
mod hotels;
mod includes;
mod repo_trait;
mod unit_of_work;
mod users;

use unit_of_work::StagedChange;

/// Connection and staging access for the repository modules only; the raw
/// session never escapes this module tree.
trait UnitOfWorkInternal {
    fn get_conn(&mut self) -> &mut diesel_async::AsyncPgConnection;

    fn stage(&mut self, change: Box<dyn StagedChange>);
}

pub use countries::CountriesRepo;
pub use hotels::HotelsRepo;
pub use includes::{CountryInclude, HotelInclude, IncludePath, NoInclude};
pub use repo_trait::Repository;
pub use unit_of_work::{PendingId, UnitOfWork, UnitOfWorkFactory};
pub use users::UsersRepo;
