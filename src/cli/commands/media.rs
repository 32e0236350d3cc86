use clap::{Arg, Command};

pub const ARG_MEDIA_BASE_URL: &str = "media-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_MEDIA_BASE_URL)
            .long(ARG_MEDIA_BASE_URL)
            .help("Base URL of the media host that stores avatars and cover images")
            .env("VIDHUB_MEDIA_BASE_URL")
            .required(true),
    )
}
