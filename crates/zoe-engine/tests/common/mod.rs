//! Shared fixtures: two fungible currencies and a swap contract.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use zoe_engine::{
    Contract, ContractEscrow, ContractFacet, ContractInstance, EscrowReceiptRecord, OfferId, Zoe,
    ZoeError,
};
use zoe_ertp::{Assay, AssetDesc, Mint, Payment};

pub struct Currencies {
    pub moola: Mint,
    pub simoleans: Mint,
}

impl Currencies {
    pub fn new() -> Self {
        Self {
            moola: Mint::nat("moola"),
            simoleans: Mint::nat("simoleans"),
        }
    }

    pub fn assays(&self) -> Vec<Assay> {
        vec![self.moola.get_assay(), self.simoleans.get_assay()]
    }

    pub fn moola(&self, n: u64) -> AssetDesc {
        self.moola.get_assay().get_desc_ops().make(n).unwrap()
    }

    pub fn simoleans(&self, n: u64) -> AssetDesc {
        self.simoleans.get_assay().get_desc_ops().make(n).unwrap()
    }
}

/// Swaps the allocations of two accepted offers and pays both out.
pub struct SwapContract {
    assays: Vec<Assay>,
    fail_on_start: bool,
}

impl SwapContract {
    pub fn new(assays: Vec<Assay>) -> Self {
        Self {
            assays,
            fail_on_start: false,
        }
    }

    pub fn failing(assays: Vec<Assay>) -> Self {
        Self {
            assays,
            fail_on_start: true,
        }
    }
}

impl Contract for SwapContract {
    fn name(&self) -> &str {
        "swap"
    }

    fn make_contract(&self, facet: ContractFacet, terms: &Value) -> Result<ContractInstance, ZoeError> {
        if self.fail_on_start {
            return Err(ZoeError::ContractFailed {
                contract: self.name().to_string(),
                reason: format!("refusing terms {terms}"),
            });
        }
        let board = SwapBoard { facet };
        Ok(ContractInstance::new(Rc::new(board), self.assays.clone()))
    }
}

/// A named seat handed out through invites.
#[derive(Debug, PartialEq, Eq)]
pub struct Seat {
    pub name: String,
}

/// The swap contract's public object.
pub struct SwapBoard {
    facet: ContractFacet,
}

impl SwapBoard {
    pub fn facet(&self) -> &ContractFacet {
        &self.facet
    }

    pub fn accept(&self, receipt: &Payment) -> Result<EscrowReceiptRecord, ZoeError> {
        self.facet.burn_escrow_receipt(receipt)
    }

    pub fn swap(&self, left: OfferId, right: OfferId) -> Result<(), ZoeError> {
        let mut extents = self.facet.get_extents_for(&[left, right])?;
        extents.swap(0, 1);
        self.facet.reallocate(&[left, right], extents)?;
        self.facet.complete(&[left, right])
    }

    pub fn invite(&self, seat: &str) -> Result<Payment, ZoeError> {
        self.facet.make_invite(
            json!({ "seat": seat }),
            Rc::new(Seat {
                name: seat.to_string(),
            }),
        )
    }
}

/// Opens a house seat and an invite while it is still starting up.
pub struct HouseContract {
    assays: Vec<Assay>,
}

impl HouseContract {
    pub fn new(assays: Vec<Assay>) -> Self {
        Self { assays }
    }
}

impl Contract for HouseContract {
    fn name(&self) -> &str {
        "house"
    }

    fn make_contract(&self, facet: ContractFacet, _terms: &Value) -> Result<ContractInstance, ZoeError> {
        let seat = facet.escrow_empty_offer()?;
        let invite = facet.make_invite(
            json!({ "seat": "early" }),
            Rc::new(Seat {
                name: "early".to_string(),
            }),
        )?;
        let house = House {
            facet,
            seat: RefCell::new(Some(seat)),
            invite: RefCell::new(Some(invite)),
        };
        Ok(ContractInstance::new(Rc::new(house), self.assays.clone()))
    }
}

pub struct House {
    facet: ContractFacet,
    seat: RefCell<Option<ContractEscrow>>,
    invite: RefCell<Option<Payment>>,
}

impl House {
    pub fn facet(&self) -> &ContractFacet {
        &self.facet
    }

    pub fn take_seat(&self) -> ContractEscrow {
        self.seat.borrow_mut().take().unwrap()
    }

    pub fn take_invite(&self) -> Payment {
        self.invite.borrow_mut().take().unwrap()
    }
}

pub fn start_swap(zoe: &Zoe, currencies: &Currencies) -> Rc<SwapBoard> {
    let installation = zoe.install(Rc::new(SwapContract::new(currencies.assays())));
    let info = zoe
        .make_instance(installation, json!({ "pair": ["moola", "simoleans"] }))
        .unwrap();
    info.instance_as::<SwapBoard>().unwrap()
}

/// The seat offer an invite stands for, read without redeeming it.
pub fn invite_offer_id(invite: &Payment) -> OfferId {
    let balance = invite.get_balance().unwrap();
    serde_json::from_value(balance.extent().as_uni().unwrap()["offerId"].clone()).unwrap()
}

pub fn nat_balances(payments: &[Payment]) -> Vec<u64> {
    payments
        .iter()
        .map(|payment| payment.get_balance().unwrap().extent().as_nat().unwrap())
        .collect()
}
