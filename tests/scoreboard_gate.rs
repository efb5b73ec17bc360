// tests/scoreboard_gate.rs
use offer_iq::campaign::CampaignContext;
use offer_iq::category::classify_campaign;
use offer_iq::offer_iq::{score_offer, Verdict};
use offer_iq::scoreboard::{build_scoreboard, gate, Status};

fn load(name: &str) -> CampaignContext {
    let raw = std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture");
    CampaignContext::from_json(&raw).expect("brief")
}

/// $200 appliance cashback, instant payout, no staff involvement.
fn strong_cashback() -> CampaignContext {
    let mut c = load("brief_appliances_cashback_10.json");
    c.offer.cashback.as_mut().unwrap().amount = Some(200.0);
    c.offer.entry.proof_of_purchase = Some(false);
    c.offer.entry.wait_days = Some(5);
    c.offer.zero_staff_burden = true;
    c
}

#[test]
fn all_green_brief_is_go() {
    let c = strong_cashback();
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    let sb = build_scoreboard(&c, &p, &iq);

    assert_eq!(iq.verdict, Verdict::Go);
    assert_eq!(gate(&sb.cells), Verdict::Go, "{:#?}", sb.cells);
    assert_eq!(sb.decision, Verdict::Go);
    assert_eq!(sb.cells.frequency_potential.status, Status::Na);
    assert!(sb.conditions.is_empty());
    assert!(sb.dealbreakers.is_empty());
    assert!(!sb.overridden);
}

#[test]
fn gate_tightens_a_go_offer() {
    let mut c = strong_cashback();
    c.offer.staff_burden = Some(true);
    c.offer.central_fulfilment = false;
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    let sb = build_scoreboard(&c, &p, &iq);

    assert_ne!(iq.verdict, Verdict::NoGo);
    assert_eq!(sb.cells.retailer_readiness.status, Status::Red);
    assert_eq!(sb.decision, Verdict::NoGo);
    assert_eq!(
        sb.dealbreakers,
        vec!["Store staff must run the mechanic with no central support".to_string()]
    );
    assert!(!sb.overridden);
}

#[test]
fn amber_cell_softens_go_to_conditions() {
    let mut c = strong_cashback();
    c.hook = None;
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    let sb = build_scoreboard(&c, &p, &iq);

    assert_eq!(iq.verdict, Verdict::Go);
    assert_eq!(sb.decision, Verdict::GoWithConditions);
    assert_eq!(sb.conditions, vec!["Write a one-line hook that names the reward".to_string()]);
}

#[test]
fn clean_gate_never_loosens_a_no_go_offer() {
    let c = load("brief_appliances_cashback_10.json");
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    assert_eq!(iq.verdict, Verdict::NoGo);

    let mut sb = build_scoreboard(&c, &p, &iq);
    assert_eq!(sb.decision, Verdict::NoGo);

    // Even with every cell forced green, the ratchet keeps the offer's NO-GO.
    sb.cells.reward_shape.status = Status::Green;
    sb.cells.friction.status = Status::Green;
    assert_eq!(gate(&sb.cells), Verdict::Go);
    assert_eq!(offer_iq::scoreboard::ratchet(gate(&sb.cells), iq.verdict), Verdict::NoGo);
}

#[test]
fn low_appliance_cashback_end_to_end() {
    let c = load("brief_appliances_cashback_10.json");
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    let sb = build_scoreboard(&c, &p, &iq);

    assert_eq!(sb.decision, Verdict::NoGo);
    assert!(sb.overridden);
    assert_eq!(sb.cells.reward_shape.status, Status::Red);
    assert_eq!(sb.cells.reward_shape.why, iq.lenses.adequacy.why);
    assert_eq!(sb.cells.reward_shape.fix.as_deref(), Some(iq.lenses.adequacy.fix.as_str()));
    assert!(sb.dealbreakers.contains(&iq.lenses.adequacy.why));
    assert!(sb.conditions.contains(&iq.lenses.adequacy.fix));
}

#[test]
fn prize_review_marks_reward_shape_amber() {
    let mut c = load("brief_prize_draw.json");
    c.offer.expected_buyers = None;
    c.offer.prizes.as_mut().unwrap().total_winners = None;
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    assert_eq!(iq.verdict, Verdict::Review);

    let sb = build_scoreboard(&c, &p, &iq);
    assert_eq!(sb.decision, Verdict::GoWithConditions);
    assert!(sb.overridden);
    assert_eq!(sb.cells.reward_shape.status, Status::Amber);
    assert_eq!(sb.cells.reward_shape.why, iq.lenses.adequacy.why);
}

#[test]
fn alcohol_briefs_need_an_age_gate() {
    let c = CampaignContext::from_json(
        r#"{"id":"beer-2","brand":"Hop Co","category":"Craft beer","market":"AU",
            "objective":"Trial","hook":"Grab a Hop Co, win a ute",
            "retailers":["BWS"],"kpis":["5% uplift"],
            "offer":{"prizes":{"heroValue":40000,"totalWinners":500,"cadence":"weekly"},
                     "expectedBuyers":20000,"centralFulfilment":true,"permitsDeclared":true}}"#,
    )
    .unwrap();
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    let sb = build_scoreboard(&c, &p, &iq);
    assert_eq!(sb.cells.compliance_risk.status, Status::Amber);
    assert!(sb.cells.compliance_risk.fix.as_deref().unwrap().contains("18+"));

    let mut gated = c.clone();
    gated.offer.age_gate = true;
    gated.notes = Some("Bottomless drinks for every winner".into());
    let sb = build_scoreboard(&gated, &p, &score_offer(&gated, &p, None));
    assert_eq!(sb.cells.compliance_risk.status, Status::Red);
    assert_eq!(sb.decision, Verdict::NoGo);
}

#[test]
fn scoreboard_is_deterministic() {
    let c = load("brief_prize_draw.json");
    let p = classify_campaign(&c);
    let iq = score_offer(&c, &p, None);
    assert_eq!(build_scoreboard(&c, &p, &iq), build_scoreboard(&c, &p, &iq));
}
