use audit_report_core::determinism::run_id::sha256_hex;
use audit_report_core::error::CoreResult;
use audit_report_core::report::archive::{
    unpack_report, ALL_EVIDENCE_DETAILS, CONTROL_STATUS, EXECUTIVE_SUMMARY, FAILED_FINDINGS,
};
use serde_json::json;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: bundle_inspector <path/to/SOC2_Weekly_Report_*.zip>");
        std::process::exit(2);
    }
    let path = std::path::Path::new(&args[1]);

    match inspect(path) {
        Ok(summary) => {
            let overall = summary["overall"] == "PASS";
            match serde_json::to_string_pretty(&summary) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("inspector error: {}", e);
                    std::process::exit(1);
                }
            }
            std::process::exit(if overall { 0 } else { 1 });
        }
        Err(e) => {
            eprintln!("inspector error: {}", e);
            std::process::exit(1);
        }
    }
}

fn inspect(path: &std::path::Path) -> CoreResult<serde_json::Value> {
    let bytes = std::fs::read(path)?;
    let report = unpack_report(&bytes)?;
    let mut checks = Vec::new();

    for (name, view_path) in [EXECUTIVE_SUMMARY, CONTROL_STATUS, FAILED_FINDINGS, ALL_EVIDENCE_DETAILS] {
        let check = match report.view(view_path) {
            Ok(text) => {
                let listed = report.manifest.views.iter().find(|v| v.path == view_path);
                match listed {
                    Some(entry) if entry.sha256 == sha256_hex(text.as_bytes()) => {
                        json!({ "view": name, "result": "PASS", "message": "" })
                    }
                    Some(_) => json!({ "view": name, "result": "FAIL", "message": "sha256 mismatch" }),
                    None => json!({ "view": name, "result": "FAIL", "message": "not listed in manifest" }),
                }
            }
            Err(e) => json!({ "view": name, "result": "FAIL", "message": e.to_string() }),
        };
        checks.push(check);
    }

    let records = report.records()?;
    let count_ok = records.len() as u64 == report.manifest.record_count;
    checks.push(json!({
        "view": ALL_EVIDENCE_DETAILS.0,
        "result": if count_ok { "PASS" } else { "FAIL" },
        "message": format!("{} records, manifest says {}", records.len(), report.manifest.record_count),
    }));

    let overall = checks.iter().all(|c| c["result"] == "PASS");
    Ok(json!({
        "overall": if overall { "PASS" } else { "FAIL" },
        "run_id": report.manifest.run_id,
        "assessment_id": report.manifest.assessment_id,
        "generated_at": report.manifest.generated_at,
        "compliance_rate": report.manifest.compliance_rate,
        "sha256": sha256_hex(&bytes),
        "checks": checks,
    }))
}
