//! LendVault command-line driver.
//!
//! A thin front end over the engine for demos and schedule previews. Real
//! deployments sit the engine behind the HTTP delivery layer; this binary
//! exists to exercise a full loan lifecycle from a terminal.

use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::process;

use lendvault_core_rs::engine::generate_installments;
use lendvault_core_rs::models::{
    Audience, DocumentKind, LoanTerm, Notification, NotificationGateway, PaymentMethod, Role,
};
use lendvault_core_rs::{
    collection_day_sheet, portfolio_summary, ActorContext, CollectionScope, EngineClock,
    EngineConfig, EngineResult, LoanEngine,
};

/// Group-lending loan engine demos
#[derive(Parser)]
#[command(
    name = "lendvault",
    version,
    about = "Loan lifecycle and ledger engine driver",
    long_about = "Drives the LendVault engine through complete loan lifecycles: \
                  application, approval, security deposit, disbursement, schedule \
                  generation, repayment, and completion."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the installment schedule for a prospective loan
    Schedule(ScheduleArgs),
    /// Run a complete weekly-loan lifecycle and print each stage
    Demo(DemoArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Cadence {
    Daily,
    Weekly,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Principal amount
    #[arg(long)]
    principal: Decimal,

    /// Flat interest rate over the whole term, percent
    #[arg(long, default_value = "45")]
    rate: Decimal,

    /// Number of installments
    #[arg(long)]
    term: u32,

    /// Installment cadence
    #[arg(long, value_enum, default_value = "weekly")]
    cadence: Cadence,

    /// Disbursement date (YYYY-MM-DD)
    #[arg(long)]
    disbursed: NaiveDate,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Principal for the demo loan
    #[arg(long, default_value = "5000")]
    principal: Decimal,

    /// Term in weeks
    #[arg(long, default_value = "10")]
    weeks: u32,
}

/// Gateway that prints deliveries instead of sending mail.
struct ConsoleGateway;

impl NotificationGateway for ConsoleGateway {
    fn deliver(&mut self, notification: &Notification) -> Result<(), String> {
        let to = match notification.audience() {
            Audience::User(id) => format!("user {id}"),
            Audience::Staff => "staff".to_string(),
        };
        println!("  [notify -> {to}] {}", notification.message());
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Schedule(args) => run_schedule(args),
        Commands::Demo(args) => run_demo(args),
    };
    if let Err(error) = result {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

fn run_schedule(args: ScheduleArgs) -> EngineResult<()> {
    use lendvault_core_rs::money::round2;
    use rust_decimal_macros::dec;

    let term = match args.cadence {
        Cadence::Daily => LoanTerm::Days(args.term),
        Cadence::Weekly => LoanTerm::Weeks(args.term),
    };
    let total = round2(args.principal * (Decimal::ONE + args.rate / dec!(100)));
    let payment = round2(total / Decimal::from(args.term.max(1)));
    let specs = generate_installments(args.disbursed, term, payment, total);

    println!(
        "principal {}  rate {}%  total {}  per-installment {}",
        args.principal, args.rate, total, payment
    );
    for spec in &specs {
        println!(
            "  #{:>3}  due {}  amount {}",
            spec.installment_number, spec.due_date, spec.amount
        );
    }
    Ok(())
}

fn run_demo(args: DemoArgs) -> EngineResult<()> {
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    let mut engine = LoanEngine::new(EngineConfig::default(), EngineClock::starting_at(start));
    let mut gateway = ConsoleGateway;

    // Staff and branch setup.
    let admin = engine.register_user("admin", "Head Office", Role::Admin)?;
    let manager = engine.register_user("manager", "Branch Manager", Role::Manager)?;
    let officer = engine.register_user("officer", "Field Officer", Role::LoanOfficer)?;
    let admin_ctx = ActorContext::new(admin);
    let manager_ctx = ActorContext::new(manager);
    let officer_ctx = ActorContext::new(officer);

    let branch = engine.create_branch(&admin_ctx, "Lusaka Central", "LSK")?;
    engine.set_branch_manager(&admin_ctx, branch, manager)?;
    engine.create_officer_profile(&admin_ctx, officer, branch, 20, 200)?;
    for i in 1..=15 {
        let group = engine.create_group(
            &officer_ctx,
            format!("Market Group {i}"),
            branch,
            "Monday",
            Some(30),
        )?;
        engine.assign_officer_to_group(&manager_ctx, group, officer)?;
    }
    println!("setup: branch, officer with 15 active groups");

    let product = engine.create_loan_type(
        &admin_ctx,
        "Weekly 45",
        Decimal::from(45),
        Decimal::from(1000),
        Decimal::from(100_000),
        lendvault_core_rs::RepaymentFrequency::Weekly,
        4,
        24,
    )?;

    // Borrower with verified KYC.
    let borrower = engine.register_user("amara", "Amara Banda", Role::Borrower)?;
    let borrower_ctx = ActorContext::new(borrower);
    for kind in DocumentKind::identity_set() {
        let doc = engine.upload_document(
            &borrower_ctx,
            borrower,
            kind,
            format!("uploads/amara/{kind:?}.jpg").to_lowercase(),
            250_000,
        )?;
        engine.verify_document(&admin_ctx, doc)?;
    }

    // Application through disbursement.
    let loan = engine.submit_application(
        &borrower_ctx,
        product,
        args.principal,
        LoanTerm::Weeks(args.weeks),
    )?;
    engine.approve_loan(&officer_ctx, loan)?;
    let l = engine.state().loan(loan).expect("just created");
    println!(
        "loan {}: total {}  per-week {}  deposit {}",
        l.application_number(),
        l.total_amount(),
        l.payment_amount(),
        l.deposit_required()
    );

    let deposit = l.deposit_required();
    let receipt =
        engine.submit_deposit(&borrower_ctx, loan, deposit, PaymentMethod::MobileMoney, None)?;
    println!("deposit paid, receipt {receipt}");
    engine.verify_deposit(&manager_ctx, loan)?;
    let outcome = engine.disburse_loan(&manager_ctx, loan)?;
    println!(
        "disbursed: {} installments, first due {:?}, maturity {:?}",
        outcome.installments, outcome.first_due, outcome.maturity_date
    );
    engine.dispatch_notifications(&mut gateway);

    // Repay week by week.
    let schedule_ids: Vec<_> = engine
        .state()
        .schedules_for_loan(loan)
        .iter()
        .map(|s| (s.id(), s.total_amount()))
        .collect();
    for (schedule_id, amount) in schedule_ids {
        engine.clock_mut().advance_days(7);
        let payment = engine.submit_payment(
            &borrower_ctx,
            loan,
            Some(schedule_id),
            amount,
            PaymentMethod::Cash,
            None,
        )?;
        let receipt = engine.confirm_payment(&officer_ctx, payment)?;
        println!(
            "  paid {}  balance {}  completed {}",
            receipt.amount, receipt.balance_remaining, receipt.loan_completed
        );
    }
    engine.dispatch_notifications(&mut gateway);

    // Reads.
    let admin_user = engine.state().user(admin).expect("registered above").clone();
    let summary = portfolio_summary(engine.state(), &admin_user);
    println!(
        "portfolio: {} loans, outstanding {}, collected {}",
        summary.total_loans, summary.total_outstanding, summary.total_collected
    );
    let sheet = collection_day_sheet(engine.state(), &admin_user, engine.clock().today());
    println!(
        "day sheet {}: expected {} collected {}",
        sheet.date, sheet.total_expected, sheet.total_collected
    );
    let _ = engine.bulk_approve_collections(
        &officer_ctx,
        CollectionScope::AllForDate {
            date: engine.clock().today(),
        },
    )?;
    println!("audit rows: {}", engine.audit().len());
    Ok(())
}
