use std::env;

use savcodec::{Missing, VarType};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: sav-dump <file.sav>");
        eprintln!("  Reads an SPSS .sav file and prints its dictionary and case count.");
        std::process::exit(1);
    }

    let path = &args[1];

    match savcodec::open_reader(path) {
        Ok(mut reader) => {
            let info = reader.info();
            println!("=== FILE HEADER ===");
            println!("  product:        {}", info.product);
            println!("  created:        {} {}", info.creation_date, info.creation_time);
            println!("  big_endian:     {}", info.big_endian);
            println!("  compressed:     {}", info.compressed);
            println!("  declared cases: {}", info.case_cnt);

            let dict = reader.dictionary().clone();
            println!("\n=== VARIABLES ({}) ===", dict.variables().len());
            for var in dict.variables() {
                let type_str = match var.var_type() {
                    VarType::Numeric => "numeric".to_string(),
                    VarType::String(w) => format!("string({w})"),
                };
                println!("  {:<10} {:<14} {}", var.short_name(), type_str, var.print_format.to_spss_string());
                if let Some(label) = &var.label {
                    println!("      label: {label:?}");
                }
                if !matches!(var.missing(), Missing::None) {
                    println!("      missing: {:?}", var.missing());
                }
                if !var.value_labels().is_empty() {
                    println!("      value labels: {} entries", var.value_labels().len());
                }
            }

            if let Some(label) = dict.file_label() {
                println!("\nfile label: {label:?}");
            }
            if let Some(idx) = dict.weight_variable() {
                println!("weight variable: {}", dict.variable(idx).short_name());
            }
            if !dict.documents().is_empty() {
                println!("\n=== DOCUMENTS ({}) ===", dict.documents().len());
                for line in dict.documents() {
                    println!("  {line}");
                }
            }

            let mut n_cases = 0usize;
            while reader.read_case().unwrap().is_some() {
                n_cases += 1;
            }
            println!("\nread {n_cases} case(s)");

            if !reader.warnings().is_empty() {
                println!("\n=== WARNINGS ({}) ===", reader.warnings().len());
                for warning in reader.warnings() {
                    println!("  {warning}");
                }
            }
        }
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}
