use crate::support::print_json_or_exit;
use serde_json::json;
use zoe_engine::get_input_price;

pub struct Args {
    pub input: u64,
    pub input_reserve: u64,
    pub output_reserve: u64,
    pub fee: u64,
    pub json: bool,
}

pub fn run(args: Args) {
    let quote = get_input_price(args.input, args.input_reserve, args.output_reserve, args.fee)
        .unwrap_or_else(|err| {
            eprintln!("error: {err}");
            std::process::exit(2);
        });
    tracing::debug!(?quote, "priced swap");

    if args.json {
        let payload = json!({
            "input": args.input,
            "inputReserve": args.input_reserve,
            "outputReserve": args.output_reserve,
            "feeInTenthOfPercent": args.fee,
            "quote": quote,
        });
        print_json_or_exit(&payload, "quote");
        return;
    }

    println!("zoe quote");
    println!("  Input: {}", args.input);
    println!(
        "  Reserves: {} in / {} out",
        args.input_reserve, args.output_reserve
    );
    println!("  Fee: {}", quote.fee);
    println!("  Tokens out: {}", quote.token_out);
    println!(
        "  New reserves: {} in / {} out",
        quote.new_input_reserve, quote.new_output_reserve
    );
}
