//! Rejection counting, in its own binary so no other test touches the counter.

#![cfg(feature = "test-hooks")]

use templatert_core::runtime::{get_filter_rejection_count, reset_filter_rejection_count};
use templatert_core::{FilterContext, RenderRuntime};

#[test]
fn invariant_rejections_are_counted() {
    reset_filter_rejection_count();
    let runtime = RenderRuntime::default();
    runtime.filter(FilterContext::HtmlElementName, "script");
    runtime.filter(FilterContext::HtmlElementName, "div");
    runtime.filter(FilterContext::CssValue, "expression(x)");
    assert_eq!(get_filter_rejection_count(), 2);
}
