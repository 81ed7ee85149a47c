//! Mapping from decoded service records to labeled gauge samples.

use crate::decoder::ServiceRecord;

/// Human-readable tag for a monit service type code.
///
/// The table is an open-ended annotation: codes monit grows in the
/// future map to an empty tag instead of failing.
pub fn service_type_name(type_code: i32) -> &'static str {
    match type_code {
        0 => "filesystem",
        1 => "directory",
        2 => "file",
        3 => "progPidfile",
        4 => "remoteHost",
        5 => "system",
        6 => "fifo",
        7 => "progPath",
        8 => "network",
        _ => "",
    }
}

/// Gauge family a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    /// `service_check{check_name,type,monitored}` — raw status code.
    CheckStatus,
    /// `service_mem_bytes{check_name,type}` — resident memory, bytes.
    Memory,
    /// `service_cpu_perc{check_name,type}` — cpu usage, percent.
    Cpu,
    /// `service_write_bytes{check_name,type}` — disk write counters.
    DiskWrite,
}

/// Sorted label key-value pairs identifying one time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub labels: Vec<(&'static str, String)>,
}

impl SeriesKey {
    fn new(mut labels: Vec<(&'static str, String)>) -> Self {
        labels.sort_by(|a, b| a.0.cmp(b.0));
        Self { labels }
    }

    /// Format labels for Prometheus exposition format.
    pub fn format_labels(&self) -> String {
        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        format!("{{{}}}", parts.join(","))
    }
}

/// One (family, label-set, value) gauge sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub family: MetricFamily,
    pub key: SeriesKey,
    pub value: f64,
}

impl Sample {
    fn new(family: MetricFamily, labels: Vec<(&'static str, String)>, value: f64) -> Self {
        Self {
            family,
            key: SeriesKey::new(labels),
            value,
        }
    }

    fn stat(family: MetricFamily, name: &str, subtype: &str, value: f64) -> Self {
        Self::new(
            family,
            vec![
                ("check_name", name.to_string()),
                ("type", subtype.to_string()),
            ],
            value,
        )
    }
}

/// Map decoded records onto gauge samples.
///
/// Pure and infallible: unknown type codes become an empty `type`
/// label, absent stat blocks simply emit no samples.
pub fn map_records(records: &[ServiceRecord]) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(records.len() * 4);

    for record in records {
        samples.push(Sample::new(
            MetricFamily::CheckStatus,
            vec![
                ("check_name", record.name.clone()),
                ("type", service_type_name(record.type_code).to_string()),
                ("monitored", record.monitored.to_string()),
            ],
            record.status as f64,
        ));

        if let Some(memory) = &record.memory {
            // Monit reports kibibytes; normalize to bytes.
            samples.push(Sample::stat(
                MetricFamily::Memory,
                &record.name,
                "kilobyte",
                (memory.kilobyte * 1024) as f64,
            ));
            samples.push(Sample::stat(
                MetricFamily::Memory,
                &record.name,
                "kilobyteTotal",
                (memory.kilobyte_total * 1024) as f64,
            ));
        }

        if let Some(cpu) = &record.cpu {
            samples.push(Sample::stat(
                MetricFamily::Cpu,
                &record.name,
                "percentage",
                cpu.percent,
            ));
            samples.push(Sample::stat(
                MetricFamily::Cpu,
                &record.name,
                "percentage_total",
                cpu.percent_total,
            ));
        }

        if let Some(write) = &record.disk_write {
            samples.push(Sample::stat(
                MetricFamily::DiskWrite,
                &record.name,
                "write_count",
                write.count as f64,
            ));
            samples.push(Sample::stat(
                MetricFamily::DiskWrite,
                &record.name,
                "write_count_total",
                write.count_total as f64,
            ));
        }
    }

    samples
}

/// Escape special characters in label values.
pub fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{CpuStats, DiskWriteStats, MemoryStats};

    fn make_record(type_code: i32, name: &str, status: i64, monitored: i32) -> ServiceRecord {
        ServiceRecord {
            type_code,
            name: name.to_string(),
            status,
            monitored,
            memory: None,
            cpu: None,
            disk_write: None,
        }
    }

    #[test]
    fn test_service_type_table() {
        assert_eq!(service_type_name(0), "filesystem");
        assert_eq!(service_type_name(5), "system");
        assert_eq!(service_type_name(8), "network");
    }

    #[test]
    fn test_unknown_type_code_maps_to_empty() {
        assert_eq!(service_type_name(99), "");
        assert_eq!(service_type_name(-1), "");

        let samples = map_records(&[make_record(99, "mystery", 0, 1)]);
        assert_eq!(samples.len(), 1);
        assert!(
            samples[0]
                .key
                .labels
                .contains(&("type", String::new()))
        );
    }

    #[test]
    fn test_status_sample_for_system_check() {
        let samples = map_records(&[make_record(5, "myhost", 0, 1)]);

        assert_eq!(samples.len(), 1);
        let sample = &samples[0];
        assert_eq!(sample.family, MetricFamily::CheckStatus);
        assert_eq!(sample.value, 0.0);
        assert!(sample.key.labels.contains(&("check_name", "myhost".to_string())));
        assert!(sample.key.labels.contains(&("type", "system".to_string())));
        assert!(sample.key.labels.contains(&("monitored", "1".to_string())));
    }

    #[test]
    fn test_status_code_passed_through_verbatim() {
        let samples = map_records(&[make_record(3, "crashed", 512, 1)]);
        assert_eq!(samples[0].value, 512.0);
    }

    #[test]
    fn test_memory_kibibyte_to_byte_conversion() {
        let mut record = make_record(5, "myhost", 0, 1);
        record.memory = Some(MemoryStats {
            percent: 6.5,
            percent_total: 0.0,
            kilobyte: 133628,
            kilobyte_total: 0,
        });

        let samples = map_records(&[record]);
        let mem: Vec<_> = samples
            .iter()
            .filter(|s| s.family == MetricFamily::Memory)
            .collect();

        assert_eq!(mem.len(), 2);
        let kb = mem
            .iter()
            .find(|s| s.key.labels.contains(&("type", "kilobyte".to_string())))
            .unwrap();
        assert_eq!(kb.value, 136835072.0);
    }

    #[test]
    fn test_cpu_and_disk_samples() {
        let mut record = make_record(3, "nginx", 0, 1);
        record.cpu = Some(CpuStats {
            percent: 0.4,
            percent_total: 0.6,
        });
        record.disk_write = Some(DiskWriteStats {
            count: 512,
            count_total: 1048576,
        });

        let samples = map_records(&[record]);
        assert_eq!(samples.len(), 5);

        let cpu_total = samples
            .iter()
            .find(|s| {
                s.family == MetricFamily::Cpu
                    && s.key.labels.contains(&("type", "percentage_total".to_string()))
            })
            .unwrap();
        assert_eq!(cpu_total.value, 0.6);

        let write_total = samples
            .iter()
            .find(|s| {
                s.family == MetricFamily::DiskWrite
                    && s.key.labels.contains(&("type", "write_count_total".to_string()))
            })
            .unwrap();
        assert_eq!(write_total.value, 1048576.0);
    }

    #[test]
    fn test_mapping_is_pure() {
        let mut record = make_record(5, "myhost", 0, 1);
        record.cpu = Some(CpuStats {
            percent: 1.0,
            percent_total: 2.0,
        });
        let records = vec![record];

        assert_eq!(map_records(&records), map_records(&records));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }
}
