//! The business tool catalog and its handlers.
//!
//! Adding a capability means writing one [`Handler`] and one line in
//! [`build_registry`].

pub mod calendar;
pub mod clients;
pub mod expenses;
pub mod handler;
pub mod invoices;
pub mod lenient;
pub mod payments;
pub mod projects;
pub mod retainers;

use std::sync::Arc;

use ledgerforge_core::{LedgerError, ToolRegistry};
use ledgerforge_store::DataStore;

pub use handler::{Handler, Registered, ToolContext, ToolOptions};

fn register<H: Handler>(
    registry: &mut ToolRegistry,
    handler: H,
    store: &Arc<dyn DataStore>,
    options: &Arc<ToolOptions>,
) -> Result<(), LedgerError> {
    registry.register(Arc::new(Registered::new(handler, Arc::clone(store), Arc::clone(options))))
}

/// Build the full catalog bound to `store`.
pub fn build_registry(store: Arc<dyn DataStore>, options: ToolOptions) -> Result<ToolRegistry, LedgerError> {
    let options = Arc::new(options);
    let mut r = ToolRegistry::new();

    register(&mut r, calendar::GetCurrentDateTime, &store, &options)?;
    register(&mut r, calendar::GetBusinessContext, &store, &options)?;
    register(&mut r, clients::FindClientByName, &store, &options)?;
    register(&mut r, projects::FindProjectByName, &store, &options)?;
    register(&mut r, clients::ListClients, &store, &options)?;
    register(&mut r, clients::CreateClient, &store, &options)?;
    register(&mut r, clients::UpdateClient, &store, &options)?;
    register(&mut r, projects::CreateProject, &store, &options)?;
    register(&mut r, projects::UpdateProjectStatus, &store, &options)?;
    register(&mut r, payments::RecordPayment, &store, &options)?;
    register(&mut r, payments::GetRevenueSummary, &store, &options)?;
    register(&mut r, payments::GetPendingPayments, &store, &options)?;
    register(&mut r, invoices::GetOverdueInvoices, &store, &options)?;
    register(&mut r, invoices::CreateInvoice, &store, &options)?;
    register(&mut r, expenses::AddQuickExpense, &store, &options)?;
    register(&mut r, expenses::GetExpenseSummary, &store, &options)?;
    register(&mut r, retainers::GetRetainerSummary, &store, &options)?;
    register(&mut r, clients::ListClientSources, &store, &options)?;

    Ok(r)
}
