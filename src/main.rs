use anyhow::Result;
use warudo_deck::launch::LaunchArgs;

fn main() -> Result<()> {
    let args = LaunchArgs::parse(std::env::args().skip(1))?;
    warudo_deck::run(args)
}
