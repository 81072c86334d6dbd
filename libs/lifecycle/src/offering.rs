//! Service offering selection.
//!
//! The plan is always the configured plan name. Ordering plans by cost is
//! not implemented.

use paasprobe_platform::ServiceOffering;

use crate::error::OfferingNotFound;

/// First offering whose label matches `label`, ignoring ASCII case.
pub fn find_offering<'a>(
    offerings: &'a [ServiceOffering],
    label: &str,
) -> Option<&'a ServiceOffering> {
    offerings
        .iter()
        .find(|offering| offering.label.eq_ignore_ascii_case(label))
}

/// Like [`find_offering`], but a miss is an error listing what was available.
pub fn select_offering<'a>(
    offerings: &'a [ServiceOffering],
    label: &str,
) -> Result<&'a ServiceOffering, OfferingNotFound> {
    find_offering(offerings, label).ok_or_else(|| OfferingNotFound {
        label: label.to_string(),
        available: offerings.iter().map(|o| o.label.clone()).collect(),
    })
}
