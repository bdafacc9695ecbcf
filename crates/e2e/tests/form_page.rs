//! Page object behavior against the in-memory form

use std::sync::Arc;
use std::time::Duration;

use subform_common::{FormConfig, FormElement, FormInput, Purpose, WithdrawalMethod};
use subform_e2e::fake::{DriverCall, FakePage};
use subform_e2e::{E2eError, SubscriptionForm, WaitState};
use test_case::test_case;

fn form_with(config: FormConfig) -> (Arc<FakePage>, SubscriptionForm) {
    let page = Arc::new(FakePage::rendered(config.clone()));
    let form = SubscriptionForm::new(page.clone(), Arc::new(config));
    (page, form)
}

fn fresh_form() -> (Arc<FakePage>, SubscriptionForm) {
    form_with(FormConfig::default())
}

fn valid_input() -> FormInput {
    FormInput {
        name: "Иван Тестов".to_string(),
        email: "aqa@test.com".to_string(),
        service: "B Service".to_string(),
        purpose: Purpose::Business,
        withdrawal: vec![WithdrawalMethod::Cash, WithdrawalMethod::Card],
        message: "Ничего не надо, я просто раннер Playwright".to_string(),
    }
}

fn checks(journal: &[DriverCall]) -> Vec<&DriverCall> {
    journal
        .iter()
        .filter(|c| matches!(c, DriverCall::Check { .. }))
        .collect()
}

#[tokio::test]
async fn fill_all_runs_steps_in_order() {
    let (page, form) = fresh_form();
    form.fill_all(&valid_input()).await.unwrap();

    let mutations: Vec<DriverCall> = page
        .journal()
        .into_iter()
        .filter(DriverCall::is_mutation)
        .collect();
    assert_eq!(
        mutations,
        vec![
            DriverCall::Fill {
                locator: "#name".into(),
                text: "Иван Тестов".into()
            },
            DriverCall::Fill {
                locator: "#email".into(),
                text: "aqa@test.com".into()
            },
            DriverCall::SelectOption {
                locator: "#service".into(),
                value: "B Service".into()
            },
            DriverCall::Check {
                locator: "#purposeBusiness".into(),
                force: false
            },
            DriverCall::Check {
                locator: "#withdrawCash".into(),
                force: true
            },
            DriverCall::Check {
                locator: "#withdrawCard".into(),
                force: true
            },
            DriverCall::Fill {
                locator: "#message".into(),
                text: "Ничего не надо, я просто раннер Playwright".into()
            },
        ]
    );

    assert_eq!(page.value(FormElement::Name).as_deref(), Some("Иван Тестов"));
    assert_eq!(page.checked(FormElement::WithdrawCrypto), Some(false));
}

#[tokio::test]
async fn toggle_waits_then_reads_before_checking() {
    let (page, form) = fresh_form();
    form.toggle(&[WithdrawalMethod::Cash]).await.unwrap();

    assert_eq!(
        page.journal(),
        vec![
            DriverCall::WaitFor {
                locator: "#withdrawCash".into(),
                state: WaitState::Visible
            },
            DriverCall::IsChecked("#withdrawCash".into()),
            DriverCall::Check {
                locator: "#withdrawCash".into(),
                force: true
            },
        ]
    );
}

#[tokio::test]
async fn toggle_is_idempotent() {
    let (page, form) = fresh_form();
    let options = [WithdrawalMethod::Cash, WithdrawalMethod::Card];

    form.toggle(&options).await.unwrap();
    let after_first: Vec<Option<bool>> = WithdrawalMethod::ALL
        .iter()
        .map(|m| page.checked(m.element()))
        .collect();

    page.clear_journal();
    form.toggle(&options).await.unwrap();
    let after_second: Vec<Option<bool>> = WithdrawalMethod::ALL
        .iter()
        .map(|m| page.checked(m.element()))
        .collect();

    assert_eq!(after_first, after_second);
    assert_eq!(after_second, vec![Some(true), Some(true), Some(false)]);
    assert!(checks(&page.journal()).is_empty(), "second toggle must not dispatch checks");
}

#[tokio::test]
async fn toggle_keeps_prior_selection_and_skips_unlisted() {
    let (page, form) = fresh_form();
    page.set_checked(FormElement::WithdrawCrypto, true);

    form.toggle(&[WithdrawalMethod::Cash]).await.unwrap();
    assert_eq!(page.checked(FormElement::WithdrawCash), Some(true));
    assert_eq!(page.checked(FormElement::WithdrawCard), Some(false));
    assert_eq!(page.checked(FormElement::WithdrawCrypto), Some(true));

    page.clear_journal();
    form.toggle(&[WithdrawalMethod::Cryptocurrency]).await.unwrap();
    assert!(checks(&page.journal()).is_empty());
    assert_eq!(page.checked(FormElement::WithdrawCrypto), Some(true));
}

#[tokio::test]
async fn toggle_rejects_unmapped_option_before_any_interaction() {
    let mut config = FormConfig::default();
    config.withdrawal.cryptocurrency = None;
    let (page, form) = form_with(config);

    let err = form
        .toggle(&[WithdrawalMethod::Cash, WithdrawalMethod::Cryptocurrency])
        .await
        .unwrap_err();

    match err {
        E2eError::UnknownOption { field, value } => {
            assert_eq!(field, "withdrawal");
            assert_eq!(value, "Cryptocurrency");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(page.journal().is_empty());
    assert_eq!(page.checked(FormElement::WithdrawCash), Some(false));
}

#[tokio::test(start_paused = true)]
async fn toggle_absorbs_delayed_rendering() {
    let (page, form) = fresh_form();
    page.reveal_after(FormElement::WithdrawCard, Duration::from_secs(2));

    assert!(!form.is_withdraw_card_visible().await.unwrap());
    form.toggle(&[WithdrawalMethod::Card]).await.unwrap();
    assert_eq!(page.checked(FormElement::WithdrawCard), Some(true));
}

#[tokio::test(start_paused = true)]
async fn toggle_reports_invisible_control_by_label() {
    let (page, form) = fresh_form();
    page.hide(FormElement::WithdrawCard);

    let err = form.toggle(&[WithdrawalMethod::Card]).await.unwrap_err();
    match err {
        E2eError::ElementNotVisible { label, timeout_ms } => {
            assert_eq!(label, "Card");
            assert_eq!(timeout_ms, 5000);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(page.checked(FormElement::WithdrawCard), Some(false));
}

#[tokio::test(start_paused = true)]
async fn submit_requires_visible_button() {
    let (page, form) = fresh_form();
    page.hide(FormElement::Submit);

    let err = form.submit().await.unwrap_err();
    assert!(
        matches!(&err, E2eError::ElementNotVisible { label, .. } if label == "Request A Quote"),
        "{}",
        err
    );
    assert!(!page.journal().iter().any(|c| matches!(c, DriverCall::Click(_))));
}

#[test_case(Purpose::Business, FormElement::PurposeBusiness, FormElement::PurposePersonal ; "business")]
#[test_case(Purpose::Personal, FormElement::PurposePersonal, FormElement::PurposeBusiness ; "personal")]
#[tokio::test]
async fn choose_selects_exactly_one_purpose(purpose: Purpose, picked: FormElement, other: FormElement) {
    let (page, form) = fresh_form();
    assert!(!form.is_purpose_selected().await.unwrap());

    form.choose(purpose).await.unwrap();
    assert!(form.is_purpose_selected().await.unwrap());
    assert_eq!(page.checked(picked), Some(true));
    assert_eq!(page.checked(other), Some(false));
}

#[tokio::test]
async fn choosing_again_moves_the_selection() {
    let (page, form) = fresh_form();
    form.choose(Purpose::Business).await.unwrap();
    form.choose(Purpose::Personal).await.unwrap();
    assert_eq!(page.checked(FormElement::PurposeBusiness), Some(false));
    assert_eq!(page.checked(FormElement::PurposePersonal), Some(true));
}

#[tokio::test]
async fn choose_rejects_unmapped_purpose() {
    let mut config = FormConfig::default();
    config.purpose.personal = None;
    let (page, form) = form_with(config);

    let err = form.choose(Purpose::Personal).await.unwrap_err();
    assert!(matches!(err, E2eError::UnknownOption { .. }));
    assert!(page.journal().is_empty());
}

#[tokio::test]
async fn select_from_list_rejects_unknown_value() {
    let (page, form) = fresh_form();

    let err = form
        .select_from_list(FormElement::Service, "Z Service")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, E2eError::UnknownOption { value, .. } if value == "Z Service"),
        "{}",
        err
    );
    assert!(page.journal().is_empty());
}

#[test_case(FormElement::Name ; "text input")]
#[test_case(FormElement::Message ; "textarea")]
#[test_case(FormElement::PurposeBusiness ; "radio button")]
#[test_case(FormElement::Submit ; "button")]
#[tokio::test]
async fn select_from_list_only_drives_dropdowns(element: FormElement) {
    let (page, form) = fresh_form();

    let err = form.select_from_list(element, "B Service").await.unwrap_err();
    assert!(matches!(err, E2eError::Config(_)), "{}", err);
    assert!(page.journal().is_empty());
}

#[tokio::test]
async fn service_selected_means_not_the_sentinel() {
    let (_page, form) = fresh_form();
    assert!(!form.is_service_selected().await.unwrap());

    form.select_from_list(FormElement::Service, "C Service")
        .await
        .unwrap();
    assert!(form.is_service_selected().await.unwrap());

    form.select_from_list(FormElement::Service, "A Service")
        .await
        .unwrap();
    assert!(!form.is_service_selected().await.unwrap());
}

#[tokio::test]
async fn empty_predicates_follow_input_values() {
    let (_page, form) = fresh_form();
    assert!(form.is_name_input_empty().await.unwrap());
    assert!(form.is_email_input_empty().await.unwrap());

    form.fill(FormElement::Name, "x").await.unwrap();
    assert!(!form.is_name_input_empty().await.unwrap());

    form.fill(FormElement::Name, "").await.unwrap();
    assert!(form.is_name_input_empty().await.unwrap());
}

#[tokio::test]
async fn visibility_predicates_answer_without_waiting() {
    let (page, form) = fresh_form();
    page.hide(FormElement::Message);

    assert!(form.is_name_input_visible().await.unwrap());
    assert!(form.is_email_input_visible().await.unwrap());
    assert!(form.is_service_select_visible().await.unwrap());
    assert!(form.is_purpose_business_visible().await.unwrap());
    assert!(form.is_purpose_personal_visible().await.unwrap());
    assert!(form.is_submit_button_visible().await.unwrap());
    assert!(form.is_withdraw_cash_visible().await.unwrap());
    assert!(form.is_withdraw_card_visible().await.unwrap());
    assert!(form.is_withdraw_crypto_visible().await.unwrap());
    assert!(!form.is_message_textarea_visible().await.unwrap());

    assert!(!page
        .journal()
        .iter()
        .any(|c| matches!(c, DriverCall::WaitFor { .. })));
}

#[tokio::test]
async fn nothing_is_visible_before_the_page_loads() {
    let config = FormConfig::default();
    let page = Arc::new(FakePage::new(config.clone()));
    let form = SubscriptionForm::new(page.clone(), Arc::new(config.clone()));

    assert!(!form.is_name_input_visible().await.unwrap());
    assert!(form.scroll_to_form().await.is_err());

    form.open().await.unwrap();
    assert_eq!(page.url().as_deref(), Some(config.url.as_str()));
    form.scroll_to_form().await.unwrap();
    assert!(form.is_name_input_visible().await.unwrap());
}

#[tokio::test]
async fn valid_form_is_submitted() {
    let (_page, form) = fresh_form();
    form.fill_all(&valid_input()).await.unwrap();

    assert!(!form.is_submitted().await);
    form.submit().await.unwrap();
    assert!(form.is_submitted().await);
}

#[tokio::test]
async fn invalid_form_is_not_submitted() {
    let (_page, form) = fresh_form();
    let input = FormInput {
        name: "A".to_string(),
        email: "invalid-email".to_string(),
        service: "A Service".to_string(),
        purpose: Purpose::Business,
        withdrawal: vec![],
        message: "PW".to_string(),
    };
    form.fill_all(&input).await.unwrap();
    form.submit().await.unwrap();

    // The status region shows, but without the success marker
    assert!(form.is_visible(FormElement::Status).await.unwrap());
    assert!(!form.is_submitted().await);
}

#[tokio::test]
async fn unreadable_status_counts_as_not_submitted() {
    let (page, form) = fresh_form();
    form.fill_all(&valid_input()).await.unwrap();
    form.submit().await.unwrap();

    page.fail_on(FormElement::Status);
    assert!(!form.is_submitted().await);

    // Other reads still propagate driver failures
    page.fail_on(FormElement::Name);
    assert!(form.is_name_input_visible().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn wait_for_submission_gives_up_after_timeout() {
    let (page, form) = fresh_form();
    page.reject_submissions();
    form.fill_all(&valid_input()).await.unwrap();
    form.submit().await.unwrap();

    assert!(!form.wait_for_submission(Duration::from_secs(3)).await);
}
