//! Column names shared by parsed input tables and exported syntheses.
//!
//! These names are the contract with the external file-reading library on
//! the input side and with downstream consumers on the output side.

// Time axes
pub const ESTAGIO: &str = "estagio";
pub const CENARIO: &str = "cenario";
pub const PATAMAR: &str = "patamar";
pub const DURACAO: &str = "duracao";
pub const DURACAO_PATAMAR: &str = "duracao_patamar";
pub const DURACAO_ESTAGIO: &str = "duracao_estagio";
pub const DATA_INICIO: &str = "data_inicio";
pub const DATA_FIM: &str = "data_fim";
pub const ITERACAO: &str = "iteracao";

// Entities
pub const CODIGO_USINA: &str = "codigo_usina";
pub const NOME_USINA: &str = "nome_usina";
pub const CODIGO_REE: &str = "codigo_ree";
pub const NOME_REE: &str = "nome_ree";
pub const CODIGO_SUBMERCADO: &str = "codigo_submercado";
pub const NOME_SUBMERCADO: &str = "nome_submercado";
pub const CODIGO_SUBMERCADO_DE: &str = "codigo_submercado_de";
pub const CODIGO_SUBMERCADO_PARA: &str = "codigo_submercado_para";

// Values
pub const VALOR: &str = "valor";
pub const LIMITE_INFERIOR: &str = "limite_inferior";
pub const LIMITE_SUPERIOR: &str = "limite_superior";
pub const PROBABILIDADE: &str = "probabilidade";
pub const VARIAVEL: &str = "variavel";

// Registration
pub const VOLUME_MINIMO: &str = "volume_minimo_hm3";
pub const VOLUME_MAXIMO: &str = "volume_maximo_hm3";
pub const VAZAO_TURBINADA_MAXIMA: &str = "vazao_turbinada_maxima_m3s";
pub const EARM_MAXIMO: &str = "earm_maximo_MWmes";

// Operative constraints
pub const CODIGO_RESTRICAO: &str = "codigo_restricao";
pub const ESTAGIO_INICIAL: &str = "estagio_inicial";
pub const ESTAGIO_FINAL: &str = "estagio_final";
pub const COEFICIENTE: &str = "coeficiente";
pub const TIPO: &str = "tipo";

// Violation log
pub const RESTRICAO: &str = "restricao";
pub const VIOLACAO: &str = "violacao";
pub const UNIDADE: &str = "unidade";
