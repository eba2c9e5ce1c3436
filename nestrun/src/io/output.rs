use crate::config::RunConfig;
use serde::{Deserialize, Serialize};
use sheetnest::io::ext_repr::{ExtNestJob, ExtNestSolution};

#[derive(Serialize, Deserialize, Clone)]
pub struct RunOutput {
    #[serde(flatten)]
    pub job: ExtNestJob,
    pub solution: ExtNestSolution,
    pub config: RunConfig,
}
