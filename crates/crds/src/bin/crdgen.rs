//! Prints the CustomResourceDefinitions of every TriggerMesh kind as a
//! multi-document YAML stream.

use crds::{AzureEventGridSource, DataWeaveTransformation};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [AzureEventGridSource::crd(), DataWeaveTransformation::crd()];
    for crd in &crds {
        print!("---\n{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
