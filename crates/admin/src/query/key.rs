//! Cache keys and cached values.

use vehicle_manager_core::{ChartPoint, SessionToken, Summary, User, Vehicle, VehicleId, VehicleList};

/// Identity of a remote query, derived from the screen and its URL state.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    /// The signed-in user.
    Me,
    /// Dashboard summary and charts.
    Home,
    /// One page of the vehicle list.
    Vehicles { page: u64, q: String },
    /// One vehicle.
    Details { id: VehicleId },
    /// Option lists for the create form.
    AddOptions,
}

/// A [`QueryKey`] scoped to the session that issued it.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub scope: SessionToken,
    pub query: QueryKey,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone)]
pub struct HomeData {
    pub summary: Summary,
    pub fuel_types: Vec<ChartPoint>,
    pub oems: Vec<ChartPoint>,
    pub registration_years: Vec<ChartPoint>,
}

/// Option lists offered by the create form.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub manufacturers: Vec<String>,
    pub models: Vec<String>,
    pub types: Vec<String>,
    pub colors: Vec<String>,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Me(User),
    Home(Box<HomeData>),
    Vehicles(VehicleList),
    Details(Box<Vehicle>),
    AddOptions(AddOptions),
}
