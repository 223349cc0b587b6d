//! Entity query services
//!
//! One service per marketplace entity. Each owns its filter registry and base
//! predicate and exposes the list/lookup operations the API layer calls.

pub mod bookings;
pub mod customers;
pub mod service_providers;

use std::sync::Arc;

use serde::Serialize;

pub use bookings::{
    Booking, BookingFilterInput, BookingService, BookingStatus, BookingStatusFilter,
};
pub use customers::{Customer, CustomerFilterInput, CustomerService};
pub use service_providers::{ServiceProvider, ServiceProviderFilterInput, ServiceProviderService};

use crate::db::DocumentStore;
use crate::graphql::orm::{FilterError, FilterExpression};
use crate::graphql::pagination::PageLimits;

/// Convert an optional typed filter input into a filter expression.
pub(crate) fn expression<T: Serialize>(
    input: Option<&T>,
) -> Result<Option<FilterExpression>, FilterError> {
    input.map(FilterExpression::from_input).transpose()
}

/// All entity services over one store
pub struct Services<S> {
    pub customers: CustomerService<S>,
    pub service_providers: ServiceProviderService<S>,
    pub bookings: BookingService<S>,
}

impl<S: DocumentStore> Services<S> {
    pub fn new(store: Arc<S>, limits: PageLimits) -> Self {
        Self {
            customers: CustomerService::new(store.clone(), limits),
            service_providers: ServiceProviderService::new(store.clone(), limits),
            bookings: BookingService::new(store, limits),
        }
    }
}
