pub mod identity_clustering;
