use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    for profile in TranscriptProfile::ALL {
        record_profile(profile)?;
        println!("wrote {}", profile.log_path());
    }
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    for command in profile.script() {
        let _ = session.handle_command(command)?;
    }
    // Help output is part of every transcript so the command set is documented.
    let _ = session.handle_command("help")?;
    Ok(())
}
