//! Pure validation rules
//!
//! Each rule is a function from the shared [`ValidationContext`] to a
//! list of issues. Rules never fetch and never read one another's
//! output; the orchestrator concatenates whatever they emit, so adding
//! a rule is adding a function here and one call site there.
//!
//! [`ValidationContext`]: crate::validation::ValidationContext

mod cross_reference;
mod invoice_stage;
mod orphaned;
mod pipeline;
mod products;
mod quote_number;
mod required_fields;
mod title;
mod tracking;

pub use cross_reference::check_quote_cross_reference;
pub use invoice_stage::check_invoice_stage;
pub use orphaned::check_orphaned_accepted_quotes;
pub use pipeline::check_pipeline_placement;
pub use products::check_product_presence;
pub use quote_number::check_accepted_quote_numbers;
pub use required_fields::check_required_fields;
pub use title::check_title_format;
pub use tracking::check_tracking_categories;
