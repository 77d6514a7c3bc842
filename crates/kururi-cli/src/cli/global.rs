/// Global flags available before or after subcommands.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalFlags {
    pub quiet: bool,
    pub verbose: bool,
}
