//! Coverage projection
//!
//! Each IN1 segment carrying a plan identifier contributes a paying party to
//! the patient's coverage, and the paying organization itself is added to the
//! bundle so the references resolve.

use crate::core::mapping::organization;
use crate::domain::fhir::types::Reference;
use crate::domain::fhir::{Coverage, Organization, PaymentBy};
use crate::domain::hl7::AdtA05;
use crate::domain::ids;

/// Builds the coverage for a patient, along with the insurer organizations
/// it references. Messages without insurance yield no coverage at all.
pub fn map_coverage(adt: &AdtA05, patient_id: &str) -> (Option<Coverage>, Vec<Organization>) {
    let mut payment_by = Vec::new();
    let mut insurers = Vec::new();

    for in1 in adt.in1() {
        let plan = in1.value(2);
        if plan.is_empty() {
            continue;
        }
        payment_by.push(PaymentBy {
            party: Some(Reference::to("Organization", &ids::deterministic_id(plan))),
        });
        insurers.push(organization::build_organization(plan, None));
    }

    if payment_by.is_empty() {
        return (None, insurers);
    }

    // The coverage id chains off the patient id so re-submissions land on
    // the same resource.
    let mut coverage = Coverage::new(
        ids::deterministic_id(patient_id),
        Reference::to("Patient", patient_id),
    );
    coverage.payment_by = payment_by;
    (Some(coverage), insurers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hl7::Message;

    fn adt(segments: &str) -> AdtA05 {
        let raw = format!(
            "MSH|^~\\&|S|SF|R|RF|20240101120000||ADT^A28^ADT_A05|MSG0001|P|2.5\r\
             EVN|A28|20240101120000\rPID|1||12345^^^SONHO^NS||DOE^JOHN||19800101|M\r{segments}"
        );
        AdtA05::new(Message::parse(&raw).unwrap()).unwrap()
    }

    #[test]
    fn test_no_insurance_yields_no_coverage() {
        let (coverage, insurers) = map_coverage(&adt(""), "patient-1");
        assert!(coverage.is_none());
        assert!(insurers.is_empty());
    }

    #[test]
    fn test_plans_become_payment_parties_and_insurers() {
        let (coverage, insurers) = map_coverage(&adt("IN1|1|PLAN9\rIN1|2|PLAN7\r"), "patient-1");
        let coverage = coverage.unwrap();
        assert_eq!(coverage.beneficiary.reference.as_deref(), Some("Patient/patient-1"));
        assert_eq!(coverage.payment_by.len(), 2);
        assert_eq!(insurers.len(), 2);
        assert_eq!(
            coverage.payment_by[0].party.as_ref().unwrap().reference.as_deref(),
            Some(format!("Organization/{}", ids::deterministic_id("PLAN9")).as_str())
        );
        assert_eq!(insurers[0].id, ids::deterministic_id("PLAN9"));
    }

    #[test]
    fn test_in1_without_plan_is_skipped() {
        let (coverage, insurers) = map_coverage(&adt("IN1|1\rIN1|2|PLAN7\r"), "patient-1");
        assert_eq!(coverage.unwrap().payment_by.len(), 1);
        assert_eq!(insurers.len(), 1);
    }
}
