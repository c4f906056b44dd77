use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use equity_dcf_core::valuation::dcf;
use equity_dcf_core::AssumptionSet;

use crate::input;

/// Assumption flags shared by every command.
///
/// The base set comes from `--input`, piped JSON on stdin, or the built-in
/// defaults, in that order; any flag given on the command line is then
/// applied on top.
#[derive(Args)]
pub struct AssumptionArgs {
    /// Path to JSON or YAML assumption file
    #[arg(long)]
    pub input: Option<String>,

    /// Company name (display only)
    #[arg(long)]
    pub company: Option<String>,

    /// Base year revenue
    #[arg(long)]
    pub base_revenue: Option<Decimal>,

    /// Current share price (omit or 0 to skip upside)
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Shares outstanding
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Net debt (negative for net cash)
    #[arg(long, allow_hyphen_values = true)]
    pub net_debt: Option<Decimal>,

    /// Year-1 revenue growth (e.g. 0.15 for 15%)
    #[arg(long, allow_hyphen_values = true)]
    pub growth_y1: Option<Decimal>,

    /// Year-5 revenue growth
    #[arg(long, allow_hyphen_values = true)]
    pub growth_y5: Option<Decimal>,

    /// Terminal (perpetuity) growth
    #[arg(long, allow_hyphen_values = true)]
    pub terminal_growth: Option<Decimal>,

    /// Current EBITDA margin
    #[arg(long, allow_hyphen_values = true)]
    pub base_margin: Option<Decimal>,

    /// EBITDA margin reached by year 5
    #[arg(long, allow_hyphen_values = true)]
    pub target_margin: Option<Decimal>,

    /// D&A as a fraction of revenue
    #[arg(long)]
    pub da_pct: Option<Decimal>,

    /// Tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Capex as a fraction of revenue
    #[arg(long)]
    pub capex_pct: Option<Decimal>,

    /// Change in NWC as a fraction of incremental revenue
    #[arg(long, allow_hyphen_values = true)]
    pub nwc_pct: Option<Decimal>,

    /// Weighted average cost of capital
    #[arg(long)]
    pub wacc: Option<Decimal>,
}

/// Arguments for DCF valuation
#[derive(Args)]
pub struct ValueArgs {
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

pub fn load_assumptions(
    args: &AssumptionArgs,
) -> Result<AssumptionSet, Box<dyn std::error::Error>> {
    let base: AssumptionSet = if let Some(ref path) = args.input {
        debug!(path = %path, "reading assumptions file");
        input::file::read_config(path)?
    } else if let Some(piped) = input::stdin::read_stdin()? {
        debug!("reading assumptions from stdin");
        piped
    } else {
        debug!("using default assumptions");
        AssumptionSet::default()
    };
    Ok(apply_flags(base, args))
}

fn apply_flags(base: AssumptionSet, args: &AssumptionArgs) -> AssumptionSet {
    AssumptionSet {
        company_name: args.company.clone().unwrap_or(base.company_name),
        base_revenue: args.base_revenue.unwrap_or(base.base_revenue),
        current_price: args.price.or(base.current_price),
        shares_outstanding: args.shares.unwrap_or(base.shares_outstanding),
        net_debt: args.net_debt.unwrap_or(base.net_debt),
        revenue_growth_y1: args.growth_y1.unwrap_or(base.revenue_growth_y1),
        revenue_growth_y5: args.growth_y5.unwrap_or(base.revenue_growth_y5),
        terminal_growth: args.terminal_growth.unwrap_or(base.terminal_growth),
        base_ebitda_margin: args.base_margin.unwrap_or(base.base_ebitda_margin),
        target_ebitda_margin: args.target_margin.unwrap_or(base.target_ebitda_margin),
        da_pct_revenue: args.da_pct.unwrap_or(base.da_pct_revenue),
        tax_rate: args.tax_rate.unwrap_or(base.tax_rate),
        capex_pct_revenue: args.capex_pct.unwrap_or(base.capex_pct_revenue),
        nwc_pct_incremental_revenue: args.nwc_pct.unwrap_or(base.nwc_pct_incremental_revenue),
        wacc: args.wacc.unwrap_or(base.wacc),
    }
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = load_assumptions(&args.assumptions)?;
    let result = dcf::run_dcf(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}
