//! Shared fixture for the integration tests.
//!
//! Builds an engine on a pinned clock with the standing cast: an admin, a
//! branch manager, a field officer carrying enough active groups to hold
//! approval authority, a weekly 45% loan product, and a KYC-verified
//! borrower.

#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use lendvault_core_rs::models::{DocumentKind, LoanTerm, PaymentMethod, Role, UserId};
use lendvault_core_rs::{ActorContext, EngineClock, EngineConfig, LoanEngine};

pub struct Fixture {
    pub engine: LoanEngine,
    pub admin: ActorContext,
    pub manager: ActorContext,
    pub officer: ActorContext,
    pub borrower: ActorContext,
    pub branch: u64,
    pub product: u64,
}

impl Fixture {
    /// Standard cast with the officer managing 15 active groups.
    pub fn new() -> Self {
        Self::build(15, EngineConfig::default())
    }

    /// Same cast, officer managing `groups` active groups.
    pub fn with_officer_groups(groups: u32) -> Self {
        Self::build(groups, EngineConfig::default())
    }

    /// Standard cast over a custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(15, config)
    }

    fn build(groups: u32, config: EngineConfig) -> Self {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let mut engine = LoanEngine::new(config, EngineClock::starting_at(start));

        let admin_id = engine.register_user("admin", "Head Office", Role::Admin).unwrap();
        let manager_id = engine
            .register_user("manager", "Branch Manager", Role::Manager)
            .unwrap();
        let officer_id = engine
            .register_user("officer", "Field Officer", Role::LoanOfficer)
            .unwrap();
        let admin = ActorContext::new(admin_id);
        let manager = ActorContext::new(manager_id);
        let officer = ActorContext::new(officer_id);

        let branch = engine.create_branch(&admin, "Lusaka Central", "LSK").unwrap();
        engine.set_branch_manager(&admin, branch, manager_id).unwrap();
        engine
            .create_officer_profile(&admin, officer_id, branch, 40, 500)
            .unwrap();
        for i in 1..=groups {
            let group = engine
                .create_group(&officer, format!("Market Group {i}"), branch, "Monday", None)
                .unwrap();
            engine.assign_officer_to_group(&manager, group, officer_id).unwrap();
        }

        let product = engine
            .create_loan_type(
                &admin,
                "Weekly 45",
                dec!(45),
                dec!(1000),
                dec!(100000),
                lendvault_core_rs::RepaymentFrequency::Weekly,
                4,
                24,
            )
            .unwrap();

        let mut fixture = Self {
            engine,
            admin,
            manager,
            officer,
            borrower: ActorContext::new(0),
            branch,
            product,
        };
        let borrower_id = fixture.register_verified_borrower("amara", "Amara Banda");
        fixture.borrower = ActorContext::new(borrower_id);
        fixture
    }

    pub fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    /// Register a borrower holding the full verified identity set.
    pub fn register_verified_borrower(&mut self, username: &str, full_name: &str) -> UserId {
        let id = self
            .engine
            .register_user(username, full_name, Role::Borrower)
            .unwrap();
        let ctx = ActorContext::new(id);
        for kind in DocumentKind::identity_set() {
            let doc = self
                .engine
                .upload_document(&ctx, id, kind, format!("uploads/{username}/{kind:?}.jpg"), 250_000)
                .unwrap();
            self.engine.verify_document(&self.admin, doc).unwrap();
        }
        id
    }

    /// Submit a weekly application for the standing borrower.
    pub fn apply(&mut self, principal: Decimal, weeks: u32) -> u64 {
        self.engine
            .submit_application(&self.borrower, self.product, principal, LoanTerm::Weeks(weeks))
            .unwrap()
    }

    /// Approve, collect and verify the deposit, and disburse; leaves the
    /// loan active with its schedule generated.
    pub fn activate(&mut self, loan: u64) {
        self.engine.approve_loan(&self.officer, loan).unwrap();
        self.pay_and_verify_deposit(loan);
        self.engine.disburse_loan(&self.manager, loan).unwrap();
    }

    /// Pay the required deposit as the loan's borrower and verify it as the
    /// manager.
    pub fn pay_and_verify_deposit(&mut self, loan: u64) {
        let l = self.engine.state().loan(loan).unwrap();
        let required = l.deposit_required();
        let borrower = ActorContext::new(l.borrower());
        self.engine
            .submit_deposit(&borrower, loan, required, PaymentMethod::MobileMoney, None)
            .unwrap();
        self.engine.verify_deposit(&self.manager, loan).unwrap();
    }

    /// Submit and confirm a payment against one installment, returning the
    /// receipt.
    pub fn pay_installment(
        &mut self,
        loan: u64,
        schedule: u64,
        amount: Decimal,
    ) -> lendvault_core_rs::PaymentReceipt {
        let borrower = ActorContext::new(self.engine.state().loan(loan).unwrap().borrower());
        let payment = self
            .engine
            .submit_payment(&borrower, loan, Some(schedule), amount, PaymentMethod::Cash, None)
            .unwrap();
        self.engine.confirm_payment(&self.admin, payment).unwrap()
    }

    /// Ids of the loan's installments, in installment order.
    pub fn schedule_ids(&self, loan: u64) -> Vec<u64> {
        self.engine
            .state()
            .schedules_for_loan(loan)
            .iter()
            .map(|s| s.id())
            .collect()
    }
}
