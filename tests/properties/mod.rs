//! Property based checks of identifiers, quote references and batch
//! accounting.

use crate::common::{TestHarness, batch_input, ctx, int_attribute};
use cmdb_attributes::validation::CrossReferenceGuard;
use cmdb_attributes::{
    AttributeError, EngineConfig, ErrorKind, InMemoryModelStore, PolicyViolation,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::future::Future;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn quote_option(object_id: &str, instance_ids: &[i64]) -> Value {
    Value::Array(
        instance_ids
            .iter()
            .map(|id| json!({"bk_obj_id": object_id, "bk_inst_id": id, "type": "int"}))
            .collect(),
    )
}

prop_compose! {
    /// Batch rows where each flag says whether the row's property id is valid.
    fn batch_rows()(flags in prop::collection::vec(any::<bool>(), 1..12)) -> Vec<bool> {
        flags
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn valid_property_ids_are_accepted(property_id in "[a-zA-Z][a-zA-Z0-9_]{0,127}") {
        prop_assume!(property_id != "bk_parent_id");
        let harness = TestHarness::new();
        let result = block_on(
            harness
                .engine
                .create_attribute(&ctx("prop-valid"), int_attribute("switch", &property_id)),
        );
        prop_assert!(result.is_ok(), "{} rejected: {:?}", property_id, result.err());
    }

    #[test]
    fn over_long_property_ids_are_rejected(property_id in "[a-zA-Z][a-zA-Z0-9_]{128,160}") {
        let harness = TestHarness::new();
        let error = block_on(
            harness
                .engine
                .create_attribute(&ctx("prop-long"), int_attribute("switch", &property_id)),
        )
        .unwrap_err();
        prop_assert_eq!(error.kind(), ErrorKind::ParameterInvalid);
    }

    #[test]
    fn property_ids_with_bad_leading_char_are_rejected(property_id in "[0-9_\\-.][a-zA-Z0-9_]{0,20}") {
        let rules = EngineConfig::default().compile().unwrap();
        prop_assert!(!rules.is_valid_property_id(&property_id));
    }

    #[test]
    fn property_ids_with_non_ascii_chars_are_rejected(
        head in "[a-zA-Z][a-zA-Z0-9_]{0,10}",
        foreign in "[\u{00c0}-\u{024f}\u{0391}-\u{03c9}\u{4e00}-\u{9fff}\u{0660}-\u{0669}]{1,4}",
        tail in "[a-zA-Z0-9_]{0,10}",
    ) {
        let rules = EngineConfig::default().compile().unwrap();
        let property_id = format!("{}{}{}", head, foreign, tail);
        prop_assert!(!rules.is_valid_property_id(&property_id));

        let harness = TestHarness::new();
        let error = block_on(
            harness
                .engine
                .create_attribute(&ctx("prop-non-ascii"), int_attribute("switch", &property_id)),
        )
        .unwrap_err();
        prop_assert_eq!(error.kind(), ErrorKind::ParameterInvalid);
    }

    #[test]
    fn quote_parsing_collapses_repeated_instances(ids in prop::collection::vec(1i64..50, 1..40)) {
        let rules = EngineConfig::default().compile().unwrap();
        let store = InMemoryModelStore::new();
        let guard = CrossReferenceGuard::new(&rules, &store, &store);

        let reference = guard.parse_option(Some(&quote_option("switch", &ids)), true).unwrap();
        let expected: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        prop_assert_eq!(&reference.object_id, "switch");
        prop_assert_eq!(&reference.instance_ids, &expected);

        let reparsed = guard
            .parse_option(Some(&quote_option("switch", &reference.instance_ids)), true)
            .unwrap();
        prop_assert_eq!(reparsed, reference);
    }

    #[test]
    fn an_object_never_quotes_itself(object_id in "[a-z][a-z0-9]{2,12}") {
        let store = InMemoryModelStore::new()
            .with_default_topology()
            .with_object(object_id.clone())
            .with_instances(object_id.clone(), [1]);
        let rules = EngineConfig::default().compile().unwrap();
        let guard = CrossReferenceGuard::new(&rules, &store, &store);

        let error = block_on(guard.validate_quote_reference(
            &ctx("prop-self"),
            &object_id,
            Some(&quote_option(&object_id, &[1])),
            true,
        ))
        .unwrap_err();
        let is_self_quote = matches!(error, AttributeError::Policy(PolicyViolation::SelfQuote { .. }));
        prop_assert!(is_self_quote);
    }

    #[test]
    fn batch_accounts_for_every_row(flags in batch_rows()) {
        let harness = TestHarness::new();
        let rows = flags
            .iter()
            .enumerate()
            .map(|(row, valid)| {
                let property_id = if *valid { format!("field{}", row) } else { format!("{}bad", row) };
                (row as i64, int_attribute("switch", &property_id))
            })
            .collect();

        let outcome = block_on(
            harness
                .engine
                .reconcile_batch(&ctx("prop-batch"), batch_input(vec![("switch", rows)])),
        );
        let switch = &outcome.report["switch"];
        let valid = flags.iter().filter(|valid| **valid).count();

        prop_assert_eq!(switch.success.len() + switch.failed_rows(), flags.len());
        prop_assert_eq!(switch.success.len(), valid);
        for info in &switch.success {
            prop_assert!(flags[info.row as usize]);
        }
        for info in &switch.errors {
            prop_assert!(!flags[info.row as usize]);
        }
        prop_assert_eq!(outcome.is_success(), valid == flags.len());
    }
}
