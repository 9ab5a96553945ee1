use std::fs;

use anyhow::{anyhow, Context, Result};

use unibi::term::{BOOL_COUNT, NUM_COUNT, STR_COUNT};
use unibi::Term;

use crate::{Dialect, DumpArgs};

pub fn dump_term(args: &DumpArgs) -> Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let term = match args.dialect {
        Dialect::Standard => Term::from_mem(&data).map_err(|e| anyhow!(e))?,
        Dialect::Netbsd => Term::from_nbc_mem(&data).map_err(|e| anyhow!(e))?,
    };
    print_term(&term);
    Ok(())
}

fn print_term(term: &Term) {
    print!("name: {}", term.name);
    if !term.aliases.is_empty() {
        print!(" (");
        for (i, alias) in term.aliases.iter().enumerate() {
            if i > 0 {
                print!("|");
            }
            print!("{alias}");
        }
        print!(")");
    }
    println!();

    println!("booleans:");
    for i in 0..BOOL_COUNT {
        let v = term.get_bool(i);
        if v > 0 {
            println!("  [{i:>3}] = true");
        }
    }

    println!("numbers:");
    for i in 0..NUM_COUNT {
        let v = term.get_num(i);
        if v >= 0 {
            println!("  [{i:>3}] = {v}");
        }
    }

    println!("strings:");
    for i in 0..STR_COUNT {
        if let Some(s) = term.get_str(i) {
            println!("  [{i:>3}] = {:?}", String::from_utf8_lossy(s));
        }
    }

    if term.count_ext_bool() + term.count_ext_num() + term.count_ext_str() > 0 {
        println!("extended booleans:");
        for i in 0..term.count_ext_bool() {
            let name = term.get_ext_bool_name(i).unwrap_or(b"?");
            println!("  {} = {}", String::from_utf8_lossy(name), term.get_ext_bool(i) > 0);
        }
        println!("extended numbers:");
        for i in 0..term.count_ext_num() {
            let name = term.get_ext_num_name(i).unwrap_or(b"?");
            println!("  {} = {}", String::from_utf8_lossy(name), term.get_ext_num(i));
        }
        println!("extended strings:");
        for i in 0..term.count_ext_str() {
            let name = term.get_ext_str_name(i).unwrap_or(b"?");
            if let Some(s) = term.get_ext_str(i) {
                println!("  {} = {:?}", String::from_utf8_lossy(name), String::from_utf8_lossy(s));
            }
        }
    }
}
