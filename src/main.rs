use std::env;
use std::fs;
use std::process;

fn main() {
  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("armlet");
    eprintln!("usage: {program} <source-file>");
    process::exit(1);
  }

  let source = match fs::read_to_string(&args[1]) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("{}: {err}", args[1]);
      process::exit(1);
    }
  };

  match armlet::generate_assembly(&source) {
    Ok(asm) => print!("{asm}"),
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
