//! CSV export of an optimizer ranking: one row per ranked candidate, one
//! count column per unit type appearing anywhere in the ranking.

use std::collections::BTreeSet;
use std::io;

use crate::data::unit::UnitTypeId;
use crate::optimizer::ranking::RankedCandidate;

const FIXED_COLUMNS: [&str; 6] = [
    "rank",
    "candidate_index",
    "win_rate",
    "draw_rate",
    "loss_ratio",
    "iterations",
];

pub fn write_ranking_csv<W: io::Write>(
    writer: W,
    ranking: &[RankedCandidate],
) -> Result<(), csv::Error> {
    let units: BTreeSet<&UnitTypeId> = ranking
        .iter()
        .flat_map(|row| row.composition.entries().iter().map(|entry| &entry.unit_type))
        .collect();

    let mut csv_writer = csv::Writer::from_writer(writer);
    let header = FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(units.iter().map(|id| id.to_string()));
    csv_writer.write_record(header)?;

    for row in ranking {
        let record = [
            row.rank.to_string(),
            row.candidate_index.to_string(),
            format!("{:.4}", row.win_rate),
            format!("{:.4}", row.draw_rate),
            format!("{:.4}", row.loss_ratio),
            row.iterations.to_string(),
        ]
        .into_iter()
        .chain(
            units
                .iter()
                .map(|id| row.composition.count_of(id).to_string()),
        );
        csv_writer.write_record(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn ranking_to_csv_string(ranking: &[RankedCandidate]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_ranking_csv(&mut buffer, ranking)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
