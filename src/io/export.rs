//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for the per-tick market export.
const MARKET_HEADER: &str = "tick,slot,demand,predicted_demand,clearing_price,predicted_price,\
                             buying_price,selling_price,load_factor,renewable_qty,total_quota,\
                             epsilon,iterations,converged,imbalance";

/// Column header for the per-plant export.
const PLANT_HEADER: &str = "tick,slot,plant_id,bid_a,bid_b,q_min,q_max,quota,scale,revenue,\
                            profit,reward";

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    File::create(path).map(io::BufWriter::new)
}

/// Exports one row per tick to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_market_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    write_market_csv(results, create(path)?)
}

/// Exports one row per tick and plant to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_plant_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    write_plant_csv(results, create(path)?)
}

/// Writes the market columns to any writer.
///
/// Output is deterministic for identical inputs. The `imbalance` column is
/// empty for converged ticks.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_market_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(MARKET_HEADER.split(',').map(str::trim))?;

    for r in results {
        let imbalance = match r.imbalance {
            Some(crate::market::Imbalance::InsufficientPower) => "insufficient_power",
            Some(crate::market::Imbalance::ExcessPower) => "excess_power",
            None => "",
        };
        wtr.write_record(&[
            r.tick.to_string(),
            r.slot.to_string(),
            format!("{:.4}", r.demand),
            format!("{:.4}", r.predicted_demand),
            format!("{:.4}", r.clearing_price),
            format!("{:.4}", r.predicted_price),
            format!("{:.4}", r.buying_price),
            format!("{:.4}", r.selling_price),
            format!("{:.4}", r.load_factor),
            format!("{:.4}", r.renewable_qty),
            format!("{:.4}", r.total_quota),
            format!("{:.4}", r.epsilon),
            r.iterations.to_string(),
            r.converged.to_string(),
            imbalance.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the plant columns to any writer, plants in configuration order.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_plant_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PLANT_HEADER.split(',').map(str::trim))?;

    for r in results {
        for p in &r.plants {
            wtr.write_record(&[
                r.tick.to_string(),
                r.slot.to_string(),
                p.plant_id.clone(),
                format!("{:.6}", p.bid.a),
                format!("{:.4}", p.bid.b),
                format!("{:.4}", p.bid.q_min),
                format!("{:.4}", p.bid.q_max),
                format!("{:.4}", p.quota),
                format!("{:.4}", p.scale),
                format!("{:.4}", p.revenue),
                format!("{:.4}", p.profit),
                p.reward.map(|v| format!("{v:.4}")).unwrap_or_default(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{Bid, Imbalance};
    use crate::sim::types::PlantRecord;

    fn make_step(t: usize) -> StepResult {
        let plant = |id: &str, quota: f64| PlantRecord {
            plant_id: id.to_string(),
            bid: Bid::new(0.01, 20.0, 0.0, 100.0),
            quota,
            scale: 1.1,
            revenue: 100.0,
            profit: 9.0,
            reward: if t == 0 { None } else { Some(0.5) },
        };
        StepResult {
            tick: t,
            slot: t % 4,
            demand: 60.0,
            predicted_demand: 55.0,
            clearing_price: 21.0,
            predicted_price: 20.0,
            buying_price: 19.95,
            selling_price: 22.05,
            load_factor: 0.75,
            renewable_qty: 10.0,
            total_quota: 60.0,
            epsilon: 0.02,
            iterations: 7,
            converged: t % 2 == 0,
            imbalance: if t % 2 == 0 {
                None
            } else {
                Some(Imbalance::ExcessPower)
            },
            plants: vec![plant("wind", 10.0), plant("coal", 50.0)],
        }
    }

    fn market_output(results: &[StepResult]) -> String {
        let mut buf = Vec::new();
        write_market_csv(results, &mut buf).ok();
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn market_header_lists_all_columns() {
        let output = market_output(&[make_step(0)]);
        let first_line = output.lines().next().unwrap_or("");
        assert_eq!(first_line.split(',').count(), 15);
        assert!(first_line.starts_with("tick,slot,demand,"));
        assert!(first_line.ends_with("converged,imbalance"));
    }

    #[test]
    fn market_row_count_matches_step_count() {
        let results: Vec<StepResult> = (0..24).map(make_step).collect();
        // 1 header + 24 data rows
        assert_eq!(market_output(&results).lines().count(), 25);
    }

    #[test]
    fn imbalance_column_is_empty_when_converged() {
        let results: Vec<StepResult> = (0..2).map(make_step).collect();
        let output = market_output(&results);
        let rows: Vec<&str> = output.lines().skip(1).collect();
        assert!(rows[0].ends_with("true,"));
        assert!(rows[1].ends_with("false,excess_power"));
    }

    #[test]
    fn plant_rows_per_tick_and_plant() {
        let results: Vec<StepResult> = (0..3).map(make_step).collect();
        let mut buf = Vec::new();
        write_plant_csv(&results, &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(12));

        let records: Vec<csv::StringRecord> = rdr.records().filter_map(Result::ok).collect();
        assert_eq!(records.len(), 6);
        assert_eq!(&records[0][2], "wind");
        assert_eq!(&records[1][2], "coal");
        // no reward settled on the first tick
        assert_eq!(&records[0][11], "");
        assert_eq!(records[2][11].parse::<f64>().ok(), Some(0.5));
        for rec in &records {
            for i in 3..11 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
        }
    }

    #[test]
    fn deterministic_output() {
        let results: Vec<StepResult> = (0..5).map(make_step).collect();
        assert_eq!(market_output(&results), market_output(&results));
    }
}
