mod common;

use common::{
    Currencies, House, HouseContract, Seat, SwapContract, invite_offer_id, nat_balances, start_swap,
};
use serde_json::json;
use std::rc::Rc;
use zoe_engine::{
    ExitCondition, ManualTimer, OfferConditions, PayoutRule, Timer, Zoe, ZoeConfig, ZoeError,
};
use zoe_ertp::{ErtpError, Extent};

fn offer_moola(currencies: &Currencies, exit: ExitCondition) -> OfferConditions {
    OfferConditions::new(
        vec![
            PayoutRule::offer_exactly(currencies.moola(3)),
            PayoutRule::want_at_least(currencies.simoleans(4)),
        ],
        exit,
    )
}

#[tokio::test]
async fn deadline_exit_refunds_once_the_timer_passes() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let _board = start_swap(&zoe, &currencies);
    let timer = Rc::new(ManualTimer::new(0));
    let exit = ExitCondition::AfterDeadline {
        deadline: 10,
        timer: Rc::clone(&timer) as Rc<dyn Timer>,
    };

    let payment = currencies.moola.mint_payment(3, "alice escrow").unwrap();
    let alice = zoe
        .escrow(offer_moola(&currencies, exit), &[Some(&payment), None])
        .unwrap();
    let offer_id = alice.exit.payoff_payment_maker().unwrap().offer_id();
    assert!(alice.exit.cancel_obj().is_none());
    assert_eq!(timer.pending(), 1);

    assert_eq!(timer.advance_to(9), 0);
    assert!(zoe.is_offer_active(offer_id));

    assert_eq!(timer.advance_to(10), 1);
    assert!(!zoe.is_offer_active(offer_id));
    assert_eq!(timer.current_time(), 10);
    assert_eq!(nat_balances(&alice.payoff.await.unwrap()), vec![3, 0]);
}

#[tokio::test]
async fn deadline_after_completion_is_a_no_op() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);
    let timer = Rc::new(ManualTimer::new(5));
    let exit = ExitCondition::AfterDeadline {
        deadline: 6,
        timer: Rc::clone(&timer) as Rc<dyn Timer>,
    };

    let payment = currencies.moola.mint_payment(3, "alice escrow").unwrap();
    let alice = zoe
        .escrow(offer_moola(&currencies, exit), &[Some(&payment), None])
        .unwrap();
    let offer_id = board.accept(&alice.escrow_receipt).unwrap().offer_id;
    board.facet().complete(&[offer_id]).unwrap();

    assert_eq!(timer.tick(), 1);
    assert_eq!(nat_balances(&alice.payoff.await.unwrap()), vec![3, 0]);
}

#[tokio::test]
async fn payoff_payments_carry_the_payoff_to_a_new_holder() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);

    let payment = currencies.moola.mint_payment(3, "alice escrow").unwrap();
    let alice = zoe
        .escrow(offer_moola(&currencies, ExitCondition::NoExit), &[Some(&payment), None])
        .unwrap();
    let maker = alice.exit.payoff_payment_maker().unwrap().clone();
    let offer_id = board.accept(&alice.escrow_receipt).unwrap().offer_id;

    let transferable = maker.make_payoff_payment(alice.payoff).unwrap();
    assert_eq!(transferable.get_assay(), zoe.get_payout_assay());

    let err = zoe
        .redeem_payoff_payment(&currencies.moola.mint_payment(1, "not a payoff").unwrap())
        .unwrap_err();
    assert!(matches!(err, ZoeError::Ertp(ErtpError::WrongAssay { .. })), "{err:?}");

    let payoff = zoe.redeem_payoff_payment(&transferable).unwrap();
    assert_eq!(payoff.offer_id(), offer_id);
    assert_eq!(
        zoe.redeem_payoff_payment(&transferable).unwrap_err(),
        ZoeError::Ertp(ErtpError::PaymentConsumed(transferable.id()))
    );

    board.facet().complete(&[offer_id]).unwrap();
    assert_eq!(nat_balances(&payoff.await.unwrap()), vec![3, 0]);
}

#[test]
fn payoff_payments_are_bound_to_their_own_offer() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let _board = start_swap(&zoe, &currencies);

    let first = currencies.moola.mint_payment(3, "first").unwrap();
    let second = currencies.moola.mint_payment(3, "second").unwrap();
    let a = zoe
        .escrow(offer_moola(&currencies, ExitCondition::NoExit), &[Some(&first), None])
        .unwrap();
    let b = zoe
        .escrow(offer_moola(&currencies, ExitCondition::NoExit), &[Some(&second), None])
        .unwrap();

    let err = a
        .exit
        .payoff_payment_maker()
        .unwrap()
        .make_payoff_payment(b.payoff)
        .unwrap_err();
    assert!(matches!(err, ZoeError::PayoffMismatch { .. }), "{err:?}");
}

#[tokio::test]
async fn invites_reveal_zoe_fields_and_the_bound_capability() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);
    let instance_id = board.facet().get_instance_id();

    let invite = board.invite("buyer").unwrap();
    assert!(zoe.get_invite_assay().is_live(&invite));

    let unwrapped = zoe.unwrap_invite(&invite).unwrap();
    assert_eq!(unwrapped.extent["seat"], json!("buyer"));
    assert_eq!(unwrapped.extent["instanceId"], json!(instance_id));
    assert_eq!(unwrapped.extent["offerId"], json!(unwrapped.offer_id));
    assert_eq!(unwrapped.extent["terms"], json!({ "pair": ["moola", "simoleans"] }));
    assert_eq!(
        unwrapped.capability_as::<Seat>().unwrap().name,
        "buyer".to_string()
    );
    assert!(unwrapped.capability_as::<String>().is_none());

    assert_eq!(
        zoe.unwrap_invite(&invite).unwrap_err(),
        ZoeError::Ertp(ErtpError::PaymentConsumed(invite.id()))
    );

    // The seat is an empty offer over the instance's assays.
    let seat = unwrapped.offer_id;
    assert!(zoe.is_offer_active(seat));
    assert_eq!(
        zoe.get_current_extents(seat).unwrap(),
        vec![Extent::Nat(0), Extent::Nat(0)]
    );
    board.facet().complete(&[seat]).unwrap();
    assert_eq!(nat_balances(&unwrapped.payoff.await.unwrap()), vec![0, 0]);
}

#[test]
fn invites_need_an_object_extent() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);

    let err = board.facet().make_invite(json!(5), Rc::new(())).unwrap_err();
    assert!(matches!(err, ZoeError::InvalidInvite(_)), "{err:?}");

    let stray = currencies.moola.mint_payment(1, "stray").unwrap();
    let err = zoe.unwrap_invite(&stray).unwrap_err();
    assert!(matches!(err, ZoeError::InvalidInvite(_)), "{err:?}");
}

#[tokio::test]
async fn contracts_can_pool_value_in_their_own_offers() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);
    let facet = board.facet();

    let pool = facet.escrow_empty_offer().unwrap();
    let deposit = currencies.moola.mint_payment(5, "liquidity").unwrap();
    let seller = facet
        .escrow_offer(
            OfferConditions::new(
                vec![
                    PayoutRule::offer_exactly(currencies.moola(5)),
                    PayoutRule::want_at_least(currencies.simoleans(0)),
                ],
                ExitCondition::NoExit,
            ),
            &[Some(&deposit), None],
        )
        .unwrap();

    facet
        .reallocate(
            &[pool.offer_id, seller.offer_id],
            vec![
                vec![Extent::Nat(5), Extent::Nat(0)],
                vec![Extent::Nat(0), Extent::Nat(0)],
            ],
        )
        .unwrap();
    facet.complete(&[pool.offer_id, seller.offer_id]).unwrap();

    assert_eq!(nat_balances(&pool.payoff.await.unwrap()), vec![5, 0]);
    assert_eq!(nat_balances(&seller.payoff.await.unwrap()), vec![0, 0]);
}

#[tokio::test]
async fn seats_opened_during_startup_cover_every_contract_assay() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let installation = zoe.install(Rc::new(HouseContract::new(currencies.assays())));
    let info = zoe.make_instance(installation, json!({})).unwrap();
    let house = info.instance_as::<House>().unwrap();
    let facet = house.facet();

    let seat = house.take_seat();
    assert_eq!(
        facet.get_extents_for(&[seat.offer_id]).unwrap(),
        vec![vec![Extent::Nat(0), Extent::Nat(0)]]
    );
    let rules = facet.get_payout_rules_for(&[seat.offer_id]).unwrap();
    assert_eq!(rules[0].len(), 2);

    let deposit = currencies.moola.mint_payment(5, "stake").unwrap();
    let stake = facet
        .escrow_offer(
            OfferConditions::new(
                vec![
                    PayoutRule::offer_exactly(currencies.moola(5)),
                    PayoutRule::want_at_least(currencies.simoleans(0)),
                ],
                ExitCondition::NoExit,
            ),
            &[Some(&deposit), None],
        )
        .unwrap();
    facet
        .reallocate(
            &[seat.offer_id, stake.offer_id],
            vec![
                vec![Extent::Nat(5), Extent::Nat(0)],
                vec![Extent::Nat(0), Extent::Nat(0)],
            ],
        )
        .unwrap();

    // The invite minted during startup leads to a seat of the same shape.
    let early = zoe.unwrap_invite(&house.take_invite()).unwrap();
    assert_eq!(early.capability_as::<Seat>().unwrap().name, "early");
    assert_eq!(
        zoe.get_current_extents(early.offer_id).unwrap(),
        vec![Extent::Nat(0), Extent::Nat(0)]
    );
    facet
        .reallocate(
            &[seat.offer_id, early.offer_id],
            vec![
                vec![Extent::Nat(2), Extent::Nat(0)],
                vec![Extent::Nat(3), Extent::Nat(0)],
            ],
        )
        .unwrap();

    facet
        .complete(&[seat.offer_id, stake.offer_id, early.offer_id])
        .unwrap();
    assert_eq!(nat_balances(&seat.payoff.await.unwrap()), vec![2, 0]);
    assert_eq!(nat_balances(&early.payoff.await.unwrap()), vec![3, 0]);
}

#[tokio::test]
async fn unredeemed_invites_retire_with_a_seat_that_pays_nothing() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);
    let facet = board.facet();
    let invite_assay = zoe.get_invite_assay();

    let idle = board.invite("idle").unwrap();
    facet.complete(&[invite_offer_id(&idle)]).unwrap();
    assert!(!invite_assay.is_live(&idle));
    assert_eq!(
        zoe.unwrap_invite(&idle).unwrap_err(),
        ZoeError::Ertp(ErtpError::PaymentConsumed(idle.id()))
    );

    // A seat that was paid into keeps its invite redeemable.
    let funded = board.invite("funded").unwrap();
    let seat = invite_offer_id(&funded);
    let deposit = currencies.moola.mint_payment(4, "gift").unwrap();
    let donor = facet
        .escrow_offer(
            OfferConditions::new(
                vec![
                    PayoutRule::offer_exactly(currencies.moola(4)),
                    PayoutRule::want_at_least(currencies.simoleans(0)),
                ],
                ExitCondition::NoExit,
            ),
            &[Some(&deposit), None],
        )
        .unwrap();
    facet
        .reallocate(
            &[seat, donor.offer_id],
            vec![
                vec![Extent::Nat(4), Extent::Nat(0)],
                vec![Extent::Nat(0), Extent::Nat(0)],
            ],
        )
        .unwrap();
    facet.complete(&[seat, donor.offer_id]).unwrap();
    assert!(invite_assay.is_live(&funded));
    let unwrapped = zoe.unwrap_invite(&funded).unwrap();
    assert_eq!(nat_balances(&unwrapped.payoff.await.unwrap()), vec![4, 0]);
}

#[test]
fn instances_describe_themselves() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let installation = zoe.install(Rc::new(SwapContract::new(currencies.assays())));
    assert_eq!(zoe.get_installation(installation).unwrap(), "swap");

    let info = zoe.make_instance(installation, json!({ "fee": 3 })).unwrap();
    let again = zoe.get_instance(info.instance_id).unwrap();
    assert_eq!(again.installation_id, installation);
    assert_eq!(again.terms, json!({ "fee": 3 }));
    assert!(again.offer_ids.is_empty());

    let board = info.instance_as::<common::SwapBoard>().unwrap();
    let labels = board.facet().get_labels().unwrap();
    let descriptions: Vec<&str> = labels.iter().map(|label| label.description()).collect();
    assert_eq!(descriptions, vec!["moola", "simoleans"]);
    assert_eq!(
        board.facet().get_assays().unwrap(),
        vec![currencies.moola.get_assay().id(), currencies.simoleans.get_assay().id()]
    );
    assert_eq!(board.facet().get_asset_desc_ops_array().unwrap().len(), 2);
    assert_eq!(board.facet().get_extent_ops_array().unwrap().len(), 2);
}

#[test]
fn failing_contracts_leave_no_instance_behind() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let installation = zoe.install(Rc::new(SwapContract::failing(currencies.assays())));

    let err = zoe.make_instance(installation, json!({})).unwrap_err();
    assert!(
        matches!(&err, ZoeError::ContractFailed { contract, .. } if contract == "swap"),
        "{err:?}"
    );
}

#[test]
fn blank_config_values_are_rejected() {
    let config = ZoeConfig {
        invite_description: "  ".to_string(),
        ..ZoeConfig::default()
    };
    let err = Zoe::with_config(config).unwrap_err();
    assert!(matches!(err, ZoeError::InvalidConfig(_)), "{err:?}");
}

#[tokio::test]
async fn dropping_zoe_breaks_outstanding_handles() {
    let currencies = Currencies::new();
    let zoe = Zoe::new();
    let board = start_swap(&zoe, &currencies);

    let payment = currencies.moola.mint_payment(3, "alice escrow").unwrap();
    let alice = zoe
        .escrow(offer_moola(&currencies, ExitCondition::OnDemand), &[Some(&payment), None])
        .unwrap();
    let offer_id = alice.exit.cancel_obj().unwrap().offer_id();
    drop(zoe);

    assert_eq!(board.facet().get_assays().unwrap_err(), ZoeError::ServiceGone);
    assert_eq!(alice.exit.cancel_obj().unwrap().cancel().unwrap_err(), ZoeError::ServiceGone);
    assert_eq!(alice.payoff.await.unwrap_err(), ZoeError::PayoffDropped(offer_id));
}
