#![deny(missing_docs)]

//! # Webhook Scaffolding
//!
//! Plans for adding admission and conversion webhooks to an operator project.
//!
//! - **resource**: Naming and placement facts derived from group/version/kind.
//! - **templates**: Skeleton files and the `cmd/main.go` inserter.
//! - **updater**: Declarations and test-suite additions applied by the
//!   structural patcher to the skeletons (or to user-edited files).

/// Group/version/kind naming.
pub mod resource;

/// Skeleton templates and marker inserters.
pub mod templates;

/// Structural patch plans.
pub mod updater;

pub use resource::Resource;
pub use templates::{MainWebhookInserter, WebhookSkeleton, WebhookSuiteSkeleton};
pub use updater::{
    apply_webhook_patches, suite_additions, webhook_declarations, FilePatch, WebhookOptions,
};
