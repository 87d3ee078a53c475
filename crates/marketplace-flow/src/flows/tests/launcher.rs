use super::common::*;
use serde_json::json;

use crate::flows::domain::{BusinessCategory, FlowKind, FlowMode};
use crate::flows::error::FlowError;
use crate::flows::launcher::{open_flow, route_prelude, FlowEntry, FlowStart};
use crate::flows::prelude::{PreludeRouter, PreludeState};

#[test]
fn create_mode_opens_on_the_prelude() {
    let start = open_flow(FlowEntry::create(FlowKind::BusinessCard)).expect("opens");

    match start {
        FlowStart::Prelude(prelude) => {
            assert_eq!(prelude.state(), PreludeState::Selecting);
            assert_eq!(prelude.kind(), FlowKind::BusinessCard);
        }
        FlowStart::Steps(_) => panic!("create mode should start on the prelude"),
    }
}

#[test]
fn profile_cards_skip_the_prelude() {
    match open_flow(FlowEntry::create(FlowKind::ProfileCard)).expect("opens") {
        FlowStart::Steps(controller) => {
            assert_eq!(controller.session().current_step(), 1);
            assert!(controller.configuration().category().is_none());
            assert!(controller.session().data().is_empty());
        }
        FlowStart::Prelude(_) => panic!("profile cards have no category prelude"),
    }
}

#[test]
fn prelude_walks_select_reselect_and_get_started() {
    let mut prelude = PreludeRouter::new(FlowKind::Listing);

    prelude.select(BusinessCategory::Retail).expect("select");
    assert_eq!(
        prelude.state(),
        PreludeState::Confirming(BusinessCategory::Retail)
    );
    let view = prelude.view();
    assert!(view.can_get_started);
    assert_eq!(
        view.confirmation.as_deref(),
        Some("You're creating a business listing for a retail business.")
    );
    assert_eq!(view.options.len(), 8);
    assert_eq!(
        view.options.iter().filter(|option| option.selected).count(),
        1
    );

    prelude.reselect().expect("back to selection");
    assert_eq!(prelude.state(), PreludeState::Selecting);
    assert!(!prelude.view().can_get_started);

    prelude.select(BusinessCategory::Technology).expect("select");
    let controller = route_prelude(&mut prelude).expect("routes");

    assert_eq!(
        prelude.state(),
        PreludeState::Routed(BusinessCategory::Technology)
    );
    assert_eq!(
        controller.configuration().category(),
        Some(BusinessCategory::Technology)
    );
    assert_eq!(controller.session().mode(), FlowMode::Create);
    assert_eq!(controller.session().data()["category"], json!("technology"));
    assert_eq!(
        controller.configuration().steps()[1].title,
        "About your technology business"
    );
}

#[test]
fn get_started_requires_a_confirmed_category() {
    let mut prelude = PreludeRouter::new(FlowKind::SellerOnboarding);

    assert_eq!(
        prelude.get_started(),
        Err(FlowError::PreludeState {
            expected: "confirming",
            found: "selecting",
        })
    );
    assert!(prelude.reselect().is_err());

    prelude.select(BusinessCategory::Construction).expect("select");
    assert!(prelude.select(BusinessCategory::Retail).is_err());
    prelude.get_started().expect("routes");

    assert!(matches!(
        prelude.get_started(),
        Err(FlowError::PreludeState {
            found: "routed",
            ..
        })
    ));
    assert!(prelude.select(BusinessCategory::Retail).is_err());
}

#[test]
fn edit_mode_bypasses_the_prelude_at_the_first_service_step() {
    let record = existing_business();
    let start = open_flow(FlowEntry::edit(record.clone())).expect("opens");

    let controller = match start {
        FlowStart::Steps(controller) => controller,
        FlowStart::Prelude(_) => panic!("edit mode never shows the prelude"),
    };
    let session = controller.session();
    assert_eq!(session.mode(), FlowMode::Edit);
    assert_eq!(
        session.current_step(),
        controller.configuration().first_service_step()
    );
    assert_eq!(session.entity_id(), Some(&record.id));
    assert_eq!(session.data(), &record.fields);
    assert_eq!(
        controller.configuration().category(),
        Some(BusinessCategory::Catering)
    );
    assert_eq!(controller.view().steps.len(), 3);
}

#[test]
fn edit_without_initial_data_fails_fast() {
    let entry = FlowEntry {
        kind: FlowKind::Listing,
        is_editing: true,
        initial_data: None,
    };

    assert_eq!(
        open_flow(entry).err(),
        Some(FlowError::MissingInitialData(FlowKind::Listing))
    );
}

#[test]
fn edit_over_another_kind_is_rejected() {
    let entry = FlowEntry {
        kind: FlowKind::Listing,
        is_editing: true,
        initial_data: Some(existing_business()),
    };

    assert_eq!(
        open_flow(entry).err(),
        Some(FlowError::KindMismatch {
            expected: FlowKind::Listing,
            found: FlowKind::BusinessCard,
        })
    );
}

#[test]
fn edit_over_an_uncategorised_entity_is_rejected() {
    let mut record = existing_business();
    record
        .fields
        .insert("category".to_string(), json!("space_mining"));

    assert_eq!(
        open_flow(FlowEntry::edit(record)).err(),
        Some(FlowError::UnknownCategory(FlowKind::BusinessCard))
    );
}

#[tokio::test]
async fn edit_submission_keeps_the_entity_id() {
    let gateway = MemoryGateway::with_record(existing_business());
    let mut controller = match open_flow(FlowEntry::edit(existing_business())).expect("opens") {
        FlowStart::Steps(controller) => controller,
        FlowStart::Prelude(_) => panic!("edit mode never shows the prelude"),
    };

    controller
        .update_step_data(fields(json!({ "yearsInBusiness": 6 })))
        .expect("merge");
    controller.next().expect("to info");
    controller.next().expect("to review");
    assert_eq!(controller.view().navigation.continue_label, "Save changes");

    let completion = controller.submit(&gateway).await.expect("saved");

    assert_eq!(completion.record.id.as_str(), "biz-42");
    assert_eq!(gateway.saved()[0].id().map(|id| id.as_str()), Some("biz-42"));
    assert_eq!(completion.record.fields["yearsInBusiness"], json!(6));
}
