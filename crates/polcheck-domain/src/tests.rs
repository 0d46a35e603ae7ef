use crate::types::*;

#[test]
fn resource_group_from_nested_resource() {
    let id = ResourceId::new("/subscriptions/S/resourceGroups/G/providers/X/Y/Z");
    assert_eq!(id.resource_group_id().unwrap().as_str(), "/subscriptions/S/resourceGroups/G");
}

#[test]
fn resource_group_of_group_is_itself() {
    let id = ResourceId::new("/subscriptions/S/resourceGroups/G");
    assert_eq!(id.resource_group_id().unwrap(), id);
}

#[test]
fn resource_group_is_case_insensitive() {
    let id = ResourceId::new("/SUBSCRIPTIONS/S/resourcegroups/G/providers/Microsoft.KeyVault/vaults/kv");
    assert_eq!(id.resource_group_id().unwrap().as_str(), "/SUBSCRIPTIONS/S/resourcegroups/G");
}

#[test]
fn resource_group_rejects_short_id() {
    assert!(ResourceId::new("/subscriptions/S").resource_group_id().is_err());
    assert!(ResourceId::new("").resource_group_id().is_err());
}

#[test]
fn resource_group_rejects_relative_id() {
    assert!(ResourceId::new("subscriptions/S/resourceGroups/G/x").resource_group_id().is_err());
}

#[test]
fn compliance_scan_finds_matching_assignment() {
    let results: ComplianceQueryResults = serde_json::from_value(serde_json::json!({
        "value": [
            { "policyAssignmentName": "a", "complianceState": "Compliant" },
            { "policyAssignmentName": "b", "complianceState": "NonCompliant" },
        ]
    }))
    .unwrap();
    assert_eq!(results.compliance_state_for("b"), NON_COMPLIANT);
    assert_eq!(results.compliance_state_for("a"), "Compliant");
    assert_eq!(results.compliance_state_for("c"), "");
}

#[test]
fn compliance_scan_takes_first_match() {
    let results: ComplianceQueryResults = serde_json::from_value(serde_json::json!({
        "value": [
            { "policyAssignmentName": "a", "complianceState": "NonCompliant" },
            { "policyAssignmentName": "a", "complianceState": "Compliant" },
        ]
    }))
    .unwrap();
    assert_eq!(results.compliance_state_for("a"), NON_COMPLIANT);
}

#[test]
fn query_results_tolerate_missing_value_and_extra_fields() {
    let empty: ComplianceQueryResults = serde_json::from_str("{}").unwrap();
    assert!(empty.values.is_empty());

    let results: ComplianceQueryResults = serde_json::from_str(
        r#"{"@odata.context":"x","value":[{"policyAssignmentName":"a","complianceState":"Compliant","resourceId":"/r"}]}"#,
    )
    .unwrap();
    assert_eq!(results.values.len(), 1);
}

#[test]
fn effect_parse_and_display() {
    assert_eq!("Audit".parse::<Effect>().unwrap(), Effect::Audit);
    assert_eq!(Effect::Deny.to_string(), "deny");
    assert!("block".parse::<Effect>().is_err());
}

#[test]
fn only_deny_blocks_deployment() {
    assert!(Effect::Allow.expects_deployment());
    assert!(Effect::Audit.expects_deployment());
    assert!(!Effect::Deny.expects_deployment());
}

#[test]
fn case_dir_and_assignment_names() {
    let tc = TestCase::new("key-vault-security", Effect::Deny).unwrap();
    assert_eq!(tc.dir_name(), "key-vault-security-deny");
    assert_eq!(tc.assignment_name("test-"), "test-key-vault-security");
}

#[test]
fn case_name_validation() {
    assert!(TestCase::new("resource-location", Effect::Allow).is_ok());
    assert!(TestCase::new("", Effect::Allow).is_err());
    assert!(TestCase::new("Has Spaces", Effect::Allow).is_err());
    assert!(TestCase::new("../escape", Effect::Allow).is_err());
    assert!(TestCase::new("-leading", Effect::Allow).is_err());
}
