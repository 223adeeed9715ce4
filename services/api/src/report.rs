use crate::infra::{build_scorer, parse_acres, parse_state};
use clap::Args;
use land_engine::config::AppConfig;
use land_engine::error::AppError;
use land_engine::parcels::rank_csv;
use land_engine::programs::{ParcelRequest, ScoreAllResponse};
use land_engine::schedules::{CostSharePracticeQuote, ProgramQuote};
use serde_json::json;
use std::fmt;
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// State name or two-letter abbreviation
    #[arg(long, value_parser = parse_state)]
    pub(crate) state: String,
    /// County name, with or without the "County" suffix
    #[arg(long)]
    pub(crate) county: String,
    /// Parcel size in acres
    #[arg(long, value_parser = parse_acres)]
    pub(crate) acres: f64,
    /// Parcel latitude; requires --lon
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub(crate) lat: Option<f64>,
    /// Parcel longitude; requires --lat
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub(crate) lon: Option<f64>,
    /// Print the full response as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Parcel CSV with state, county, acres, purchase_price_per_acre,
    /// expected_payment_per_acre_year1 and risk_score columns
    pub(crate) csv: PathBuf,
    /// Write the ranked CSV here instead of stdout
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let scorer = build_scorer(&config)?;

    let mut request = ParcelRequest::new(args.state, args.county, args.acres);
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        request.geometry = Some(json!({ "lat": lat, "lon": lon }));
    }

    let response = match scorer.score_all(&request).await {
        Ok(response) => response,
        Err(err) => {
            println!("Quote rejected: {}", err);
            return Ok(());
        }
    };

    if args.json {
        let body = serde_json::to_string_pretty(&response).map_err(std::io::Error::from)?;
        println!("{body}");
    } else {
        print!("{}", render_quotes(&response));
    }
    Ok(())
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let file = File::open(&args.csv)?;
    let ranked = rank_csv(file)?;

    match args.output {
        Some(path) => std::fs::write(&path, &ranked.body)?,
        None => std::io::stdout().write_all(&ranked.body)?,
    }
    eprintln!(
        "ranked {} parcels ({} rows skipped)",
        ranked.ranked, ranked.skipped
    );
    Ok(())
}

pub(crate) fn render_quotes(response: &ScoreAllResponse) -> String {
    QuoteReport(response).to_string()
}

/// Plain-text rendering of a combined quote.
struct QuoteReport<'a>(&'a ScoreAllResponse);

impl fmt::Display for QuoteReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.0;
        let gis = &response.gis;

        writeln!(
            f,
            "Program quotes for {}, {} ({} acres)",
            response.county, response.state, response.acres
        )?;
        writeln!(
            f,
            "GIS: {} | slope {:.1}% | hydric {:.1}% | wetland {} | floodplain {} | stream {:.1} m",
            gis.land_cover,
            gis.slope_percent,
            gis.hydric_percent,
            gis.nwi_class,
            if gis.in_100yr_floodplain { "yes" } else { "no" },
            gis.distance_to_stream_m
        )?;

        writeln!(f, "\nCRP ({} practices)", response.crp.practices.len())?;
        for practice in &response.crp.practices {
            writeln!(
                f,
                "  - {} {}: ${:.2}/yr | ${:.2} over {} yrs",
                practice.crp_practice_code,
                practice.crp_practice_name,
                practice.annual_payment,
                practice.total_contract_payment,
                practice.contract_years
            )?;
        }

        write_cost_share(f, "EQIP", &response.eqip)?;
        write_cost_share(f, "CSP", &response.csp)
    }
}

fn write_cost_share(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    quote: &ProgramQuote<CostSharePracticeQuote>,
) -> fmt::Result {
    writeln!(f, "\n{} ({} practices)", label, quote.practices.len())?;
    for practice in &quote.practices {
        writeln!(
            f,
            "  - {} {}: ${:.2} ({} @ ${:.2}/{})",
            practice.practice_code,
            practice.scenario_name,
            practice.annual_payment,
            practice.payment_type,
            practice.unit_rate,
            practice.unit
        )?;
    }
    Ok(())
}
