//! Loading isotopologue measurements and simulation output
use super::*;
use std::path::Path;

/// Column names of a measurement table
///
/// Times are recorded in minutes. When the table carries no experiment
/// column, the file stem names the experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct Columns {
    pub experiment: String,
    pub time: String,
    pub isotopologues: Isotopologues,
}

impl Default for Columns {
    fn default() -> Columns {
        Columns {
            experiment: "Experiment".into(),
            time: "Time in minutes".into(),
            isotopologues: Isotopologues::default(),
        }
    }
}

fn stem<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn position(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

/// Parse a numeric field; empty cells and "NF" (not found) are missing
fn field(record: &csv::StringRecord, idx: usize, column: &str) -> Result<f64> {
    let value = record.get(idx).unwrap_or("").trim();
    match value {
        "" | "NF" | "nf" | "NaN" | "nan" => Ok(f64::NAN),
        v => v.parse::<f64>().map_err(|_| Error::Parse {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            column: column.to_string(),
            value: v.to_string(),
        }),
    }
}

/// Read one comma separated measurement table into [`Sample`]s
pub fn read_samples<P: AsRef<Path>>(path: P, columns: &Columns) -> Result<Vec<Sample>> {
    let fallback = stem(&path);
    let mut rdr = csv::Reader::from_path(&path)?;
    let headers = rdr.headers()?.clone();

    let experiment = position(&headers, &columns.experiment).ok();
    let time = position(&headers, &columns.time)?;
    let unlabelled = position(&headers, &columns.isotopologues.unlabelled)?;
    let labelled = columns
        .isotopologues
        .labelled
        .iter()
        .map(|name| position(&headers, name).map(|idx| (idx, name.as_str())))
        .collect::<Result<Vec<_>>>()?;

    let mut samples = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let experiment = match experiment {
            Some(idx) => record.get(idx).unwrap_or("").trim().to_string(),
            None => fallback.clone(),
        };
        let minutes = field(&record, time, &columns.time)?;
        if minutes.is_nan() {
            log::warn!("{}: skipping row without time point", experiment);
            continue;
        }
        let labelled = labelled
            .iter()
            .map(|&(idx, name)| field(&record, idx, name))
            .collect::<Result<Vec<_>>>()?;
        samples.push(Sample::from_minutes(
            experiment,
            minutes,
            field(&record, unlabelled, &columns.isotopologues.unlabelled)?,
            labelled,
        ));
    }
    log::info!("read {} samples from {}", samples.len(), path.as_ref().display());
    Ok(samples)
}

/// Default offset of the labelling pulse in simulation output, in minutes
pub const MODEL_START_TIME: f64 = 10_000.0;

/// Read tab separated output of a kinetic model simulation
///
/// Time is shifted by `start_time` minutes and converted to hours; points
/// before the pulse are dropped. `[NAD]` holds the unlabelled pool, so the
/// labelled fraction is `Values[NAD_labelled_sum] / ([NAD] + Values[NAD_labelled_sum])`.
pub fn read_model_output<P: AsRef<Path>>(path: P, start_time: f64) -> Result<Vec<Labelling>> {
    let experiment = stem(&path);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)?;
    let headers = rdr.headers()?.clone();
    let time = position(&headers, "Time")?;
    let unlabelled = position(&headers, "[NAD]")?;
    let labelled = position(&headers, "Values[NAD_labelled_sum]")?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let hours = (field(&record, time, "Time")? - start_time) / 60.0;
        if !(hours >= 0.0) {
            continue;
        }
        let unlabelled = field(&record, unlabelled, "[NAD]")?;
        let labelled = field(&record, labelled, "Values[NAD_labelled_sum]")?;
        rows.push(Labelling::new(experiment.clone(), hours, unlabelled, &[labelled]));
    }
    Ok(rows)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_tmp(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("turnover-parser-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn samples() {
        let path = write_tmp(
            "HeLa.csv",
            "Time in minutes,No label,N15,5C13,5C13N15,10C13,10C13N15\n\
             0,100,0,0,0,0,0\n\
             60,80,NF,10,0,10,0\n\
             ,1,1,1,1,1,1\n",
        );
        let samples = read_samples(&path, &Columns::default()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].experiment, "HeLa");
        assert_eq!(samples[1].time, 1.0);
        assert!(samples[1].labelled[0].is_nan());
        assert_eq!(samples[1].labelled[1], 10.0);
    }

    #[test]
    fn missing_column() {
        let path = write_tmp("short.csv", "Time in minutes,No label\n0,1\n");
        assert!(matches!(
            read_samples(&path, &Columns::default()),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn bad_number() {
        let path = write_tmp(
            "bad.csv",
            "Experiment,Time in minutes,No label,N15,5C13,5C13N15,10C13,10C13N15\n\
             a,0,x,0,0,0,0,0\n",
        );
        assert!(matches!(
            read_samples(&path, &Columns::default()),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn model_output() {
        let path = write_tmp(
            "sim.tsv",
            "Time\t[NAD]\tValues[NAD_labelled_sum]\n\
             9940\t100\t0\n\
             10000\t100\t0\n\
             10060\t100\t25\n",
        );
        let rows = read_model_output(&path, MODEL_START_TIME).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, 0.0);
        assert_eq!(rows[1].time, 1.0);
        assert_eq!(rows[1].unlabelled, 100.0);
        assert_eq!(rows[1].sum_labelled, 25.0);
        assert_eq!(rows[1].sum_labelled_percent, 20.0);
        assert_eq!(rows[1].no_label_percent, 80.0);
        assert_eq!(rows[1].experiment, "sim");
    }
}
