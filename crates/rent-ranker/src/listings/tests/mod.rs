mod common;
mod reconcile;
mod routing;
