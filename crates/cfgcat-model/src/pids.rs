//! Well-known pids of system data the checker interprets directly.

/// Configuring properties of a configuration area (responsible authority and successor).
pub const ATG_AREA_PROPERTIES: &str = "atg.configurationAreaProperties";

/// Area change information. Records whose every value is a zero timestamp are legacy data.
pub const ATG_AREA_CHANGE_INFORMATION: &str = "atg.configurationAreaChangeInformation";

/// Default parameter datasets attached to types and configuration objects.
pub const ATG_DEFAULT_PARAMETER_DATASETS: &str = "atg.defaultParameterDatasets";

/// Parameter type hierarchy definition.
pub const ATG_HIERARCHY_DEFINITION: &str = "atg.hierarchyDefinition";

/// Aspect under which a parameter's desired value is published.
pub const ASP_PARAMETER_DESIRED: &str = "asp.parameterDesired";

/// Aspect under which a parameter's target value is published.
pub const ASP_PARAMETER_TARGET: &str = "asp.parameterTarget";

/// Field names of the area properties record.
pub mod area_properties {
    pub const AUTHORITY: &str = "authority";
    pub const NEW_AUTHORITY: &str = "newAuthority";
}

/// Field names of one default parameter dataset entry.
pub mod default_parameter {
    pub const DATASETS: &str = "datasets";
    pub const TYPE: &str = "type";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const SERIALIZER_VERSION: &str = "serializerVersion";
    pub const DATA: &str = "data";
}

/// Field names of a hierarchy definition record.
pub mod hierarchy {
    pub const OBJECT_TYPE: &str = "objectType";
    pub const ENTRIES: &str = "hierarchy";
    pub const SET_NAME: &str = "setName";
    pub const SUCCESSOR_TYPE: &str = "successorType";
}
