pub mod annot;
pub mod tf_list;
pub use annot::AnnotStruct;
pub use annot::GeneRecord;
pub use annot::HeaderMap;
pub use tf_list::TfList;
